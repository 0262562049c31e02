//! Acceptable temperature range
//!
//! `Thresholds` is only ever constructed through validation, so holding one
//! means `min < max` with both bounds finite. Raw user text lives in
//! [`ThresholdInputs`] until it is promoted.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default lower bound when nothing has been stored yet
pub const DEFAULT_MIN: f64 = 20.0;

/// Default upper bound when nothing has been stored yet
pub const DEFAULT_MAX: f64 = 30.0;

/// Validation failures for a threshold pair
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("threshold {field} must be a finite number")]
    NonFinite { field: ThresholdField },

    #[error("minimum ({min}) must be less than maximum ({max})")]
    InvalidRange { min: f64, max: f64 },

    #[error("threshold {field} is not a number: {raw:?}")]
    Unparseable { field: ThresholdField, raw: String },
}

/// Which bound of the range an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdField {
    Min,
    Max,
}

impl ThresholdField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for ThresholdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThresholdField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "min" => Ok(ThresholdField::Min),
            "max" => Ok(ThresholdField::Max),
            _ => anyhow::bail!("Invalid threshold field: {}", s),
        }
    }
}

/// A validated `[min, max]` range in °C
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredThresholds", into = "StoredThresholds")]
pub struct Thresholds {
    min: f64,
    max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
        }
    }
}

impl Thresholds {
    /// Validate and build a range.
    pub fn new(min: f64, max: f64) -> Result<Self, ThresholdError> {
        if !min.is_finite() {
            return Err(ThresholdError::NonFinite {
                field: ThresholdField::Min,
            });
        }
        if !max.is_finite() {
            return Err(ThresholdError::NonFinite {
                field: ThresholdField::Max,
            });
        }
        if min >= max {
            return Err(ThresholdError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Candidate range with one bound replaced, keeping the other as is.
    pub fn with(&self, field: ThresholdField, value: f64) -> Result<Self, ThresholdError> {
        match field {
            ThresholdField::Min => Self::new(value, self.max),
            ThresholdField::Max => Self::new(self.min, value),
        }
    }

    /// Inclusive containment check.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}°C, {}°C]", self.min, self.max)
    }
}

/// Persisted form: `{ "min": "20", "max": "30" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredThresholds {
    pub min: String,
    pub max: String,
}

impl From<Thresholds> for StoredThresholds {
    fn from(t: Thresholds) -> Self {
        // f64 Display is the shortest representation that parses back exactly
        Self {
            min: t.min.to_string(),
            max: t.max.to_string(),
        }
    }
}

impl TryFrom<StoredThresholds> for Thresholds {
    type Error = ThresholdError;

    fn try_from(stored: StoredThresholds) -> Result<Self, Self::Error> {
        let min = parse_bound(ThresholdField::Min, &stored.min)?;
        let max = parse_bound(ThresholdField::Max, &stored.max)?;
        Thresholds::new(min, max)
    }
}

fn parse_bound(field: ThresholdField, raw: &str) -> Result<f64, ThresholdError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ThresholdError::Unparseable {
            field,
            raw: raw.to_string(),
        })
}

/// Raw text currently shown in the min/max input fields.
///
/// Not validated: may be empty or a partial numeral such as `"-"` or `"2."`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdInputs {
    pub min: String,
    pub max: String,
}

impl ThresholdInputs {
    pub fn set(&mut self, field: ThresholdField, raw: String) {
        match field {
            ThresholdField::Min => self.min = raw,
            ThresholdField::Max => self.max = raw,
        }
    }
}

impl From<&Thresholds> for ThresholdInputs {
    fn from(t: &Thresholds) -> Self {
        let stored = StoredThresholds::from(*t);
        Self {
            min: stored.min,
            max: stored.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let t = Thresholds::default();
        assert_eq!(t.min(), 20.0);
        assert_eq!(t.max(), 30.0);
    }

    #[test]
    fn test_new_validates_ordering() {
        assert!(Thresholds::new(10.0, 10.5).is_ok());
        assert_eq!(
            Thresholds::new(25.0, 20.0),
            Err(ThresholdError::InvalidRange { min: 25.0, max: 20.0 })
        );
        assert!(matches!(
            Thresholds::new(20.0, 20.0),
            Err(ThresholdError::InvalidRange { .. })
        ));
        assert!(matches!(
            Thresholds::new(f64::NAN, 20.0),
            Err(ThresholdError::NonFinite {
                field: ThresholdField::Min
            })
        ));
        assert!(matches!(
            Thresholds::new(0.0, f64::INFINITY),
            Err(ThresholdError::NonFinite {
                field: ThresholdField::Max
            })
        ));
    }

    #[test]
    fn test_with_replaces_one_bound() {
        let t = Thresholds::default();
        let lowered = t.with(ThresholdField::Min, 15.0).unwrap();
        assert_eq!((lowered.min(), lowered.max()), (15.0, 30.0));

        assert!(t.with(ThresholdField::Max, 20.0).is_err());
        assert!(t.with(ThresholdField::Min, 35.0).is_err());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let t = Thresholds::default();
        assert!(t.contains(20.0));
        assert!(t.contains(30.0));
        assert!(t.contains(25.3));
        assert!(!t.contains(19.99));
        assert!(!t.contains(30.01));
    }

    #[test]
    fn test_stored_form_uses_strings() {
        let t = Thresholds::new(18.5, 27.0).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"min":"18.5","max":"27"}"#);

        let parsed: Thresholds = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, t);
    }

    #[test]
    fn test_stored_form_rejects_bad_data() {
        let inverted: Result<Thresholds, _> = serde_json::from_str(r#"{"min":"30","max":"20"}"#);
        assert!(inverted.is_err());

        let garbage: Result<Thresholds, _> = serde_json::from_str(r#"{"min":"cold","max":"20"}"#);
        assert!(garbage.is_err());
    }

    #[test]
    fn test_round_trip_awkward_values() {
        for (min, max) in [(0.1, 0.2), (-40.0, -39.9), (1e-3, 123.456789)] {
            let t = Thresholds::new(min, max).unwrap();
            let back: Thresholds = StoredThresholds::from(t).try_into().unwrap();
            assert_eq!(back, t);
        }
    }

    #[test]
    fn test_field_parsing() {
        assert_eq!("MIN".parse::<ThresholdField>().unwrap(), ThresholdField::Min);
        assert_eq!("max".parse::<ThresholdField>().unwrap(), ThresholdField::Max);
        assert!("avg".parse::<ThresholdField>().is_err());
    }

    #[test]
    fn test_inputs_from_thresholds() {
        let inputs = ThresholdInputs::from(&Thresholds::default());
        assert_eq!(inputs.min, "20");
        assert_eq!(inputs.max, "30");
    }
}
