pub mod fetch;
pub mod monitor;
pub mod thresholds;
