//! Alert deduplication.
//!
//! Keeps the last value an alert fired for and suppresses repeats of it.
//! Returning to range does not clear the memory; only a threshold change or
//! an explicit reset does.

use serde::Serialize;

use crate::evaluator::Evaluation;

/// Dedup memory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum DedupState {
    /// No alert remembered.
    #[default]
    Quiet,
    /// An alert already fired for this value.
    Alerted(f64),
}

/// What to do with one evaluated reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    /// Reading is in range; nothing to send.
    InRange,
    /// New out-of-range value; send an alert.
    Fire,
    /// Same value as the last alert; stay silent.
    Suppress,
}

#[derive(Debug, Default)]
pub struct AlertDeduplicator {
    state: DedupState,
}

impl AlertDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DedupState {
        self.state
    }

    /// Feed one evaluation through the state machine.
    pub fn observe(&mut self, value: f64, evaluation: &Evaluation) -> AlertDecision {
        if evaluation.in_range {
            return AlertDecision::InRange;
        }

        match self.state {
            DedupState::Alerted(last) if last == value => AlertDecision::Suppress,
            _ => {
                self.state = DedupState::Alerted(value);
                AlertDecision::Fire
            }
        }
    }

    /// Forget the last alerted value.
    pub fn reset(&mut self) {
        self.state = DedupState::Quiet;
    }
}
