//! Threshold evaluation.
//!
//! Pure mapping from a value and a validated range to an in-range flag and,
//! when out of range, a description of which bound was crossed.

use thermowatch_shared::utils::format_celsius;
use thermowatch_shared::{Thresholds, ViolationKind};

/// A crossed bound together with the figures involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub value: f64,
    pub bound: f64,
}

impl Violation {
    /// Human-readable description naming both the value and the bound.
    pub fn message(&self) -> String {
        match self.kind {
            ViolationKind::BelowMin => format!(
                "Temperature ({}) is below the minimum ({})",
                format_celsius(self.value),
                format_celsius(self.bound)
            ),
            ViolationKind::AboveMax => format!(
                "Temperature ({}) is above the maximum ({})",
                format_celsius(self.value),
                format_celsius(self.bound)
            ),
        }
    }
}

/// Outcome of evaluating one value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub in_range: bool,
    pub violation: Option<Violation>,
}

impl Evaluation {
    pub fn violation_message(&self) -> Option<String> {
        self.violation.as_ref().map(Violation::message)
    }
}

/// Evaluate `value` against `thresholds`.
///
/// Below-min is checked before above-max. A value that compares false to
/// both bounds (NaN) is reported as above max, never as in range.
pub fn evaluate(value: f64, thresholds: &Thresholds) -> Evaluation {
    if thresholds.contains(value) {
        return Evaluation {
            in_range: true,
            violation: None,
        };
    }

    let violation = if value < thresholds.min() {
        Violation {
            kind: ViolationKind::BelowMin,
            value,
            bound: thresholds.min(),
        }
    } else {
        Violation {
            kind: ViolationKind::AboveMax,
            value,
            bound: thresholds.max(),
        }
    };

    Evaluation {
        in_range: false,
        violation: Some(violation),
    }
}
