//! Company fundamentals and description abstractions

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub trailing_eps: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_eps: Option<f64>,
    pub forward_pe: Option<f64>,
    /// Ratio, 0.45 means 45%.
    pub gross_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub business_summary: Option<String>,
}

#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals>;
}

#[async_trait]
pub trait DescriptionProvider: Send + Sync {
    /// Localized business description, `None` when the source has none.
    async fn fetch_description(&self, symbol: &str) -> Result<Option<String>>;
}
