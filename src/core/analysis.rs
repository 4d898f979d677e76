//! Turns a fetched price history and the structure parameters into a report.
use crate::core::backtest::{self, BreachResult, ThresholdSet};
use crate::core::price::{PriceHistory, PriceSeries};
use crate::core::profile::Fundamentals;
use anyhow::{Result, anyhow, bail};
use chrono::Days;
use serde::Serialize;
use std::ops::RangeInclusive;

pub const MAX_TICKERS: usize = 5;

const KO_RANGE: RangeInclusive<f64> = 50.0..=150.0;
const STRIKE_RANGE: RangeInclusive<f64> = 50.0..=150.0;
const KI_RANGE: RangeInclusive<f64> = 0.0..=100.0;
const PERIOD_RANGE: RangeInclusive<u32> = 1..=36;

/// Percentages of the reference price plus the product tenor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StructureParams {
    pub ko_pct: f64,
    pub strike_pct: f64,
    /// Zero means no knock-in barrier.
    pub ki_pct: f64,
    pub period_months: u32,
}

impl StructureParams {
    pub fn validate(&self) -> Result<()> {
        check_range("KO", self.ko_pct, &KO_RANGE)?;
        check_range("Strike", self.strike_pct, &STRIKE_RANGE)?;
        check_range("KI", self.ki_pct, &KI_RANGE)?;
        if !PERIOD_RANGE.contains(&self.period_months) {
            bail!(
                "Period must be between {} and {} months, got {}",
                PERIOD_RANGE.start(),
                PERIOD_RANGE.end(),
                self.period_months
            );
        }

        if self.ko_pct <= self.strike_pct {
            bail!(
                "KO ({}%) must be greater than Strike ({}%)",
                self.ko_pct,
                self.strike_pct
            );
        }
        if self.ki_pct > 0.0 && self.strike_pct <= self.ki_pct {
            bail!(
                "Strike ({}%) must be greater than KI ({}%) when KI is set",
                self.strike_pct,
                self.ki_pct
            );
        }
        Ok(())
    }

    pub fn ki_enabled(&self) -> bool {
        self.ki_pct > 0.0
    }
}

fn check_range(name: &str, value: f64, range: &RangeInclusive<f64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(anyhow!(
            "{name} must be between {}% and {}%, got {value}%",
            range.start(),
            range.end()
        ))
    }
}

/// Splits comma separated tickers, trimming and upper-casing each one.
///
/// Duplicates are dropped, keeping first-seen order.
pub fn parse_tickers<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<String>> {
    let mut tickers: Vec<String> = Vec::new();
    for ticker in inputs
        .iter()
        .flat_map(|input| input.as_ref().split(','))
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
    {
        if !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }

    if tickers.is_empty() {
        bail!("At least one ticker is required");
    }
    if tickers.len() > MAX_TICKERS {
        bail!(
            "At most {MAX_TICKERS} tickers can be analyzed at once, got {}",
            tickers.len()
        );
    }
    Ok(tickers)
}

/// Backtest outcome for one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct TickerReport {
    pub symbol: String,
    pub short_name: Option<String>,
    pub currency: String,
    pub reference_price: f64,
    pub thresholds: ThresholdSet,
    pub observations: usize,
    /// Percentage of historical windows ending at or above the strike.
    pub profit_probability: f64,
    pub breach: BreachResult,
    pub fundamentals: Option<Fundamentals>,
    pub description: Option<String>,
    /// Most recent part of the history, used for charting.
    pub chart: PriceSeries,
}

/// Runs the backtest for one fetched history.
///
/// The reference price is the latest close; probability and breach analysis
/// use the full history, the chart keeps the last `chart_years` years.
pub fn build_report(
    history: &PriceHistory,
    params: &StructureParams,
    chart_years: u32,
) -> Result<TickerReport> {
    let latest = history
        .series
        .last()
        .ok_or_else(|| anyhow!("No price data found for symbol: {}", history.symbol))?;

    let closes = history.series.closes();
    let thresholds = backtest::derive_thresholds(
        latest.close,
        params.ko_pct,
        params.strike_pct,
        params.ki_pct,
    );
    let profit_probability =
        backtest::estimate_profit_probability(closes, thresholds.strike_price, params.period_months);
    let breach = backtest::analyze_breach(closes, thresholds.strike_price, thresholds.ki_price);

    // A window reaching past the earliest representable date keeps everything.
    let chart = match latest
        .date
        .checked_sub_days(Days::new(365 * u64::from(chart_years)))
    {
        Some(chart_start) => history.series.since(chart_start),
        None => history.series.clone(),
    };

    Ok(TickerReport {
        symbol: history.symbol.clone(),
        short_name: history.short_name.clone(),
        currency: history.currency.clone(),
        reference_price: latest.close,
        thresholds,
        observations: closes.len(),
        profit_probability,
        breach,
        fundamentals: None,
        description: None,
        chart,
    })
}
