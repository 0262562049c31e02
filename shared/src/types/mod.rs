//! Data types exchanged between the feed, the engine and its consumers

pub mod alert;
pub mod reading;
pub mod thresholds;
