pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::analysis::{StructureParams, parse_tickers};
use crate::core::config::AppConfig;
use crate::core::{Fundamentals, PriceHistory};
use crate::providers::moneydj::MoneyDjProvider;
use crate::providers::yahoo_finance::{YahooFinanceProvider, YahooProfileProvider};
use crate::store::MemoryCache;
use anyhow::Result;
use chrono::NaiveDate;
use cli::analyze::AnalyzeOptions;
use std::sync::Arc;
use tracing::debug;

/// Arguments of an analysis run; unset values come from the config defaults.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeArgs {
    pub tickers: Vec<String>,
    pub ko_pct: Option<f64>,
    pub strike_pct: Option<f64>,
    pub ki_pct: Option<f64>,
    pub period_months: Option<u32>,
    pub start: Option<NaiveDate>,
    pub json: bool,
}

pub enum AppCommand {
    Analyze(AnalyzeArgs),
}

fn resolve_params(args: &AnalyzeArgs, config: &AppConfig) -> StructureParams {
    let defaults = &config.defaults;
    StructureParams {
        ko_pct: args.ko_pct.unwrap_or(defaults.ko_pct),
        strike_pct: args.strike_pct.unwrap_or(defaults.strike_pct),
        ki_pct: args.ki_pct.unwrap_or(defaults.ki_pct),
        period_months: args.period_months.unwrap_or(defaults.period_months),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Analyze(args) => {
            let tickers = if args.tickers.is_empty() {
                parse_tickers(&config.defaults.tickers)?
            } else {
                parse_tickers(&args.tickers)?
            };
            let params = resolve_params(&args, &config);
            params.validate()?;

            let options = AnalyzeOptions {
                start: args.start.unwrap_or(config.defaults.start_date),
                chart_years: config.defaults.chart_years,
                json: args.json,
            };

            let history_cache = Arc::new(MemoryCache::<String, PriceHistory>::new());
            let profile_cache = Arc::new(MemoryCache::<String, Fundamentals>::new());
            let description_cache = Arc::new(MemoryCache::<String, Option<String>>::new());

            let yahoo_url = config.providers.yahoo_url();
            let history_provider =
                YahooFinanceProvider::new(yahoo_url, history_cache, config.cache.history_ttl());
            let profile_provider =
                YahooProfileProvider::new(yahoo_url, profile_cache, config.cache.profile_ttl());
            let description_provider = MoneyDjProvider::new(
                config.providers.moneydj_url(),
                description_cache,
                config.cache.profile_ttl(),
            );

            cli::analyze::run(
                &tickers,
                &params,
                &options,
                &history_provider,
                &profile_provider,
                &description_provider,
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_values_override_config_defaults() {
        let config = AppConfig::default();
        let args = AnalyzeArgs {
            strike_pct: Some(75.0),
            ki_pct: Some(0.0),
            ..AnalyzeArgs::default()
        };

        let params = resolve_params(&args, &config);
        assert_eq!(params.ko_pct, 100.0);
        assert_eq!(params.strike_pct, 75.0);
        assert_eq!(params.ki_pct, 0.0);
        assert_eq!(params.period_months, 6);
    }
}
