use super::util::{REQUEST_TIMEOUT, with_retry};
use crate::core::cache::Cache;
use crate::core::price::{HistoryProvider, PriceHistory, PricePoint, PriceSeries};
use crate::core::profile::{Fundamentals, ProfileProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = "fcn/0.1";

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    currency: Option<String>,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
    #[serde(alias = "gmtoffset", default)]
    gmt_offset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

/// Pairs timestamps with closes, shifted to exchange-local dates.
///
/// Missing or non-positive closes are skipped, as are bars dated on or before
/// the previous kept bar (Yahoo repeats the live bar during market hours).
fn extract_price_points(item: &ChartItem) -> Vec<PricePoint> {
    let (Some(timestamps), Some(closes)) = (
        item.timestamp.as_ref(),
        item.indicators
            .as_ref()
            .and_then(|inds| inds.quote.first())
            .and_then(|q| q.close.as_ref()),
    ) else {
        return Vec::new();
    };

    let mut points: Vec<PricePoint> = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite() && *c > 0.0) else {
            continue;
        };
        let Some(date) =
            DateTime::from_timestamp(ts + item.meta.gmt_offset, 0).map(|dt| dt.date_naive())
        else {
            continue;
        };
        if points.last().is_some_and(|last| date <= last.date) {
            continue;
        }
        points.push(PricePoint { date, close });
    }
    points
}

fn date_to_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Daily close history from the Yahoo Finance chart API.
pub struct YahooFinanceProvider {
    base_url: String,
    cache: Arc<dyn Cache<String, PriceHistory>>,
    ttl: Duration,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, cache: Arc<dyn Cache<String, PriceHistory>>, ttl: Duration) -> Self {
        YahooFinanceProvider {
            base_url: base_url.to_string(),
            cache,
            ttl,
        }
    }
}

#[async_trait]
impl HistoryProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooHistoryFetch",
        skip(self),
        fields(symbol = %symbol, start = %start)
    )]
    async fn fetch_history(&self, symbol: &str, start: NaiveDate) -> Result<PriceHistory> {
        let cache_key = format!("{symbol}@{start}");
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url,
            symbol,
            date_to_timestamp(start),
            Utc::now().timestamp()
        );
        debug!("Requesting price history from {}", url);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = with_retry(|| client.get(&url).send(), 2, 500)
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        if let Some(error) = data.chart.error {
            return Err(anyhow!(
                "Yahoo error for symbol {}: {}",
                symbol,
                error.description.unwrap_or_default()
            ));
        }

        let item = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let points = extract_price_points(&item);
        if points.is_empty() {
            return Err(anyhow!("No price data found for symbol: {}", symbol));
        }
        debug!(observations = points.len(), "Parsed price history");

        let history = PriceHistory {
            symbol: symbol.to_string(),
            currency: item.meta.currency.unwrap_or_else(|| "USD".to_string()),
            short_name: item.meta.short_name,
            series: PriceSeries::new(points)
                .with_context(|| format!("Invalid price history for {symbol}"))?,
        };

        self.cache
            .put(cache_key, history.clone(), Some(self.ttl))
            .await;
        Ok(history)
    }
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(alias = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryItem>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct QuoteSummaryItem {
    #[serde(alias = "defaultKeyStatistics")]
    key_statistics: KeyStatistics,
    #[serde(alias = "summaryDetail")]
    summary_detail: SummaryDetail,
    #[serde(alias = "financialData")]
    financial_data: FinancialData,
    #[serde(alias = "assetProfile")]
    asset_profile: AssetProfile,
}

/// Yahoo wraps numbers as `{"raw": 1.5, "fmt": "1.50"}`, or `{}` when unknown.
#[derive(Deserialize, Debug, Default)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct KeyStatistics {
    #[serde(alias = "trailingEps")]
    trailing_eps: Option<RawValue>,
    #[serde(alias = "forwardEps")]
    forward_eps: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SummaryDetail {
    #[serde(alias = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(alias = "forwardPE")]
    forward_pe: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct FinancialData {
    #[serde(alias = "grossMargins")]
    gross_margins: Option<RawValue>,
    #[serde(alias = "debtToEquity")]
    debt_to_equity: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct AssetProfile {
    #[serde(alias = "longBusinessSummary")]
    long_business_summary: Option<String>,
}

impl From<QuoteSummaryItem> for Fundamentals {
    fn from(item: QuoteSummaryItem) -> Self {
        Fundamentals {
            trailing_eps: raw(item.key_statistics.trailing_eps),
            trailing_pe: raw(item.summary_detail.trailing_pe),
            forward_eps: raw(item.key_statistics.forward_eps),
            forward_pe: raw(item.summary_detail.forward_pe),
            gross_margin: raw(item.financial_data.gross_margins),
            debt_to_equity: raw(item.financial_data.debt_to_equity),
            business_summary: item
                .asset_profile
                .long_business_summary
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Valuation figures and business summary from the Yahoo quote summary API.
pub struct YahooProfileProvider {
    base_url: String,
    cache: Arc<dyn Cache<String, Fundamentals>>,
    ttl: Duration,
}

impl YahooProfileProvider {
    pub fn new(base_url: &str, cache: Arc<dyn Cache<String, Fundamentals>>, ttl: Duration) -> Self {
        YahooProfileProvider {
            base_url: base_url.to_string(),
            cache,
            ttl,
        }
    }
}

#[async_trait]
impl ProfileProvider for YahooProfileProvider {
    #[instrument(name = "YahooProfileFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        if let Some(cached) = self.cache.get(&symbol.to_string()).await {
            return Ok(cached);
        }

        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=defaultKeyStatistics,financialData,summaryDetail,assetProfile",
            self.base_url, symbol
        );
        debug!("Requesting quote summary from {}", url);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: QuoteSummaryResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        if let Some(error) = data.quote_summary.error {
            return Err(anyhow!(
                "Yahoo error for symbol {}: {}",
                symbol,
                error.description.unwrap_or_default()
            ));
        }

        let fundamentals: Fundamentals = data
            .quote_summary
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| anyhow!("No profile data found for symbol: {}", symbol))?
            .into();

        self.cache
            .put(symbol.to_string(), fundamentals.clone(), Some(self.ttl))
            .await;
        Ok(fundamentals)
    }
}
