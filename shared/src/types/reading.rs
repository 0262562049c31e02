//! Temperature readings
//!
//! A reading is one timestamped observation delivered by a metric feed.
//! Readings are immutable once created and always carry a finite value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a reading from untrusted input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadingError {
    #[error("reading value must be finite, got {0}")]
    NonFinite(f64),
}

/// One temperature observation in °C
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistoryRecord", into = "HistoryRecord")]
pub struct Reading {
    value: f64,
    observed_at: DateTime<Utc>,
}

impl Reading {
    /// Create a reading, rejecting NaN and infinities.
    pub fn new(value: f64, observed_at: DateTime<Utc>) -> Result<Self, ReadingError> {
        if !value.is_finite() {
            return Err(ReadingError::NonFinite(value));
        }
        Ok(Self { value, observed_at })
    }

    /// Create a reading stamped with the current time.
    pub fn now(value: f64) -> Result<Self, ReadingError> {
        Self::new(value, Utc::now())
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// Wire form of a reading: `{ "temperature": 21.5, "timestamp": "2024-..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<HistoryRecord> for Reading {
    type Error = ReadingError;

    fn try_from(record: HistoryRecord) -> Result<Self, Self::Error> {
        Reading::new(record.temperature, record.timestamp)
    }
}

impl From<Reading> for HistoryRecord {
    fn from(reading: Reading) -> Self {
        Self {
            temperature: reading.value,
            timestamp: reading.observed_at,
        }
    }
}
