//! Shared types and utilities for Thermowatch
//!
//! This crate contains the data structures that cross crate and wire
//! boundaries (readings, thresholds, alerts) and small helpers used by
//! both the monitoring engine and the command-line interface.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{alert::*, reading::*, thresholds::*};
