//! Core business logic abstractions

pub mod analysis;
pub mod backtest;
pub mod cache;
pub mod config;
pub mod log;
pub mod price;
pub mod profile;

// Re-export main types for cleaner imports
pub use analysis::{StructureParams, TickerReport};
pub use price::{HistoryProvider, PriceHistory, PriceSeries};
pub use profile::{DescriptionProvider, Fundamentals, ProfileProvider};
