//! Error types for the monitoring engine and its collaborators.
//!
//! None of these are fatal: feed and notification failures are logged and
//! counted, storage failures degrade to defaults or keep the previous range,
//! and input failures are reverted locally.

use thermowatch_shared::ThresholdField;
use thiserror::Error;

/// Errors produced by a metric feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The source could not be reached or returned an error status.
    #[error("Feed unavailable: {0}")]
    Unavailable(String),

    /// The source answered with a payload that is not a valid reading.
    #[error("Malformed feed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Malformed(err.to_string())
        } else {
            FeedError::Unavailable(err.to_string())
        }
    }
}

/// Errors produced by a threshold store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be read.
    #[error("Threshold storage unavailable: {0}")]
    Unavailable(String),

    /// The backing medium rejected a write.
    #[error("Failed to write thresholds: {0}")]
    Write(String),

    /// Stored data exists but does not describe a valid range.
    #[error("Stored thresholds are corrupt: {0}")]
    Corrupt(String),
}

/// Errors produced by a notification channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Delivery(err.to_string())
    }
}

/// Rejections from committing a threshold edit.
#[derive(Debug, Error)]
pub enum InputError {
    /// Empty or non-numeric text.
    #[error("Invalid number for {field}: {raw:?}")]
    InvalidNumber { field: ThresholdField, raw: String },

    /// The candidate range would have `min >= max`.
    #[error("Minimum ({min}) must be less than maximum ({max})")]
    InvalidRange { min: f64, max: f64 },

    /// The store refused the new range; the previous one stays in force.
    #[error("Failed to persist thresholds: {0}")]
    Persist(#[source] StoreError),

    /// The engine has been stopped.
    #[error("Monitoring engine is stopped")]
    Stopped,
}

/// Lifecycle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Monitoring engine already started")]
    AlreadyStarted,

    #[error("Monitoring engine is stopped")]
    Stopped,
}
