use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_MONEYDJ_URL: &str = "https://www.moneydj.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MoneyDjProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub moneydj: Option<MoneyDjProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_URL.to_string(),
            }),
            moneydj: Some(MoneyDjProviderConfig {
                base_url: DEFAULT_MONEYDJ_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn yahoo_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_URL, |p| p.base_url.as_str())
    }

    pub fn moneydj_url(&self) -> &str {
        self.moneydj
            .as_ref()
            .map_or(DEFAULT_MONEYDJ_URL, |p| p.base_url.as_str())
    }
}

/// Structure and backtest values used when the command line omits them.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DefaultsConfig {
    pub tickers: Vec<String>,
    pub ko_pct: f64,
    pub strike_pct: f64,
    pub ki_pct: f64,
    pub period_months: u32,
    pub start_date: NaiveDate,
    pub chart_years: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            tickers: vec!["TSLA".to_string(), "NVDA".to_string(), "GOOG".to_string()],
            ko_pct: 100.0,
            strike_pct: 80.0,
            ki_pct: 65.0,
            period_months: 6,
            start_date: NaiveDate::from_ymd_opt(2009, 1, 1).unwrap_or_default(),
            chart_years: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub history_ttl_secs: u64,
    pub profile_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            history_ttl_secs: 3600,
            profile_ttl_secs: 86400,
        }
    }
}

impl CacheConfig {
    pub fn history_ttl(&self) -> Duration {
        Duration::from_secs(self.history_ttl_secs)
    }

    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("tw", "fcn", "fcn")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
  moneydj:
    base_url: "http://example.com/moneydj"
defaults:
  tickers: ["AAPL", "MSFT"]
  ko_pct: 105
  strike_pct: 85
  ki_pct: 0
  period_months: 12
  start_date: 2015-06-01
cache:
  history_ttl_secs: 60
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.providers.yahoo_url(), "http://example.com/yahoo");
        assert_eq!(config.providers.moneydj_url(), "http://example.com/moneydj");
        assert_eq!(config.defaults.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(config.defaults.ko_pct, 105.0);
        assert_eq!(config.defaults.strike_pct, 85.0);
        assert_eq!(config.defaults.ki_pct, 0.0);
        assert_eq!(config.defaults.period_months, 12);
        assert_eq!(
            config.defaults.start_date,
            NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()
        );
        // Unset fields keep their defaults
        assert_eq!(config.defaults.chart_years, 3);
        assert_eq!(config.cache.history_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.profile_ttl(), Duration::from_secs(86400));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config.providers.yahoo_url(), DEFAULT_YAHOO_URL);
        assert_eq!(config.providers.moneydj_url(), DEFAULT_MONEYDJ_URL);
        assert_eq!(config.defaults.tickers, vec!["TSLA", "NVDA", "GOOG"]);
        assert_eq!(config.defaults.ko_pct, 100.0);
        assert_eq!(config.defaults.strike_pct, 80.0);
        assert_eq!(config.defaults.ki_pct, 65.0);
        assert_eq!(config.defaults.period_months, 6);
        assert_eq!(
            config.defaults.start_date,
            NaiveDate::from_ymd_opt(2009, 1, 1).unwrap()
        );
        assert_eq!(config.cache.history_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_missing_provider_falls_back_to_default_url() {
        let yaml_str = r#"
providers:
  yahoo:
    base_url: "http://localhost:1234"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.providers.yahoo_url(), "http://localhost:1234");
        assert!(config.providers.moneydj.is_none());
        assert_eq!(config.providers.moneydj_url(), DEFAULT_MONEYDJ_URL);
    }
}
