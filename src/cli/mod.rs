pub mod analyze;
pub mod chart;
pub mod setup;
pub mod ui;
