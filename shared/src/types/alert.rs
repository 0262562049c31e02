//! Fired alert records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::Reading;
use super::thresholds::Thresholds;

/// Default notification title
pub const DEFAULT_ALERT_TITLE: &str = "Temperature alert";

/// Direction in which a reading left the acceptable range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    BelowMin,
    AboveMax,
}

/// An alert that passed deduplication and was handed to the notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub kind: ViolationKind,
    pub reading: Reading,
    pub thresholds: Thresholds,
    pub fired_at: DateTime<Utc>,
}

/// A title/body pair as seen by a notification channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

