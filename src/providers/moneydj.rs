use crate::core::cache::Cache;
use crate::core::profile::DescriptionProvider;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Label of the business overview row on the profile page.
const OVERVIEW_LABEL: &str = "經營概述";
/// Shorter texts are placeholders rather than real descriptions.
const MIN_DESCRIPTION_CHARS: usize = 50;
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(5);

/// Finds the text node right after the overview label.
///
/// Text nodes are split into lines, trimmed and blank lines skipped before
/// matching, so only the first line of a multi-line overview is kept.
pub fn extract_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let mut lines = document
        .root_element()
        .text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty());

    lines.find(|line| *line == OVERVIEW_LABEL)?;
    lines
        .next()
        .filter(|description| description.chars().count() > MIN_DESCRIPTION_CHARS)
        .map(str::to_string)
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-TW,zh;q=0.9"));
    headers
}

/// Traditional Chinese company overview scraped from MoneyDJ.
pub struct MoneyDjProvider {
    base_url: String,
    cache: Arc<dyn Cache<String, Option<String>>>,
    ttl: Duration,
}

impl MoneyDjProvider {
    pub fn new(base_url: &str, cache: Arc<dyn Cache<String, Option<String>>>, ttl: Duration) -> Self {
        Self {
            base_url: base_url.to_string(),
            cache,
            ttl,
        }
    }
}

#[async_trait]
impl DescriptionProvider for MoneyDjProvider {
    #[instrument(name = "MoneyDjDescriptionFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_description(&self, symbol: &str) -> Result<Option<String>> {
        let key = symbol.to_lowercase();
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let url = format!("{}/us/basic/basic0001/{}", self.base_url, key);
        debug!("Requesting company description from {}", url);

        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .timeout(SCRAPE_TIMEOUT)
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

        let body = response.text().await?;
        let description = extract_description(&body);
        if description.is_none() {
            debug!("No company overview found on page");
        }

        self.cache.put(key, description.clone(), Some(self.ttl)).await;
        Ok(description)
    }
}
