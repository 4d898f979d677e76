//! Price history abstractions and core types

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes ordered by strictly increasing date, every close positive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        let mut dates = Vec::with_capacity(points.len());
        let mut closes = Vec::with_capacity(points.len());

        for point in points {
            if !point.close.is_finite() || point.close <= 0.0 {
                bail!("Invalid close {} on {}", point.close, point.date);
            }
            if let Some(last) = dates.last() {
                if point.date <= *last {
                    bail!("Price dates out of order at {}", point.date);
                }
            }
            dates.push(point.date);
            closes.push(point.close);
        }

        Ok(Self { dates, closes })
    }

    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Result<Self> {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, close)| PricePoint {
                date: start + Duration::days(i as i64),
                close: *close,
            })
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn last(&self) -> Option<PricePoint> {
        Some(PricePoint {
            date: *self.dates.last()?,
            close: *self.closes.last()?,
        })
    }

    /// Points dated on or after `since`.
    pub fn since(&self, since: NaiveDate) -> PriceSeries {
        let start = self.dates.partition_point(|d| *d < since);
        PriceSeries {
            dates: self.dates[start..].to_vec(),
            closes: self.closes[start..].to_vec(),
        }
    }
}

/// Price history of one symbol as returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub currency: String,
    pub short_name: Option<String>,
    pub series: PriceSeries,
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Daily closes for `symbol` from `start` until today.
    async fn fetch_history(&self, symbol: &str, start: NaiveDate) -> Result<PriceHistory>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let points = vec![
            PricePoint {
                date: date(2024, 1, 2),
                close: 10.0,
            },
            PricePoint {
                date: date(2024, 1, 2),
                close: 11.0,
            },
        ];
        let err = PriceSeries::new(points).unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn test_series_rejects_non_positive_close() {
        let result = PriceSeries::from_closes(date(2024, 1, 1), &[10.0, 0.0]);
        assert!(result.is_err());
        let result = PriceSeries::from_closes(date(2024, 1, 1), &[10.0, f64::NAN]);
        assert!(result.is_err());
    }

    #[test]
    fn test_series_since() {
        let series = PriceSeries::from_closes(date(2024, 1, 1), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let recent = series.since(date(2024, 1, 3));
        assert_eq!(recent.closes(), &[3.0, 4.0]);
        assert_eq!(recent.dates()[0], date(2024, 1, 3));
        assert!(series.since(date(2025, 1, 1)).is_empty());
        assert_eq!(series.since(date(2000, 1, 1)).len(), 4);
    }

    #[test]
    fn test_series_last() {
        let series = PriceSeries::from_closes(date(2024, 1, 1), &[1.0, 2.5]).unwrap();
        assert_eq!(
            series.last(),
            Some(PricePoint {
                date: date(2024, 1, 2),
                close: 2.5
            })
        );
        assert_eq!(PriceSeries::default().last(), None);
    }
}
