//! DetectionResult - detection pipeline output
//!
//! One named, typed result per field per update cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single detection for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultState {
    /// A new value was read
    Success,
    /// The value was read and equals the previous one
    SameNoChange,
    /// Nothing was detected in the target area
    Empty,
    /// The raw text was rejected by the field's filter
    FailedFilter,
    /// Detection failed
    Error,
    /// Detection has not completed yet
    Pending,
}

/// Raw detected value: text as read, or a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectedValue {
    Number(serde_json::Number),
    Text(String),
}

impl DetectedValue {
    /// Create a text value
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Create an integer value
    pub fn int(n: i64) -> Self {
        Self::Number(n.into())
    }

    /// Create a floating point value
    ///
    /// Non-finite inputs cannot be represented in JSON and fall back to their text form.
    pub fn float(f: f64) -> Self {
        match serde_json::Number::from_f64(f) {
            Some(n) => Self::Number(n),
            None => Self::Text(f.to_string()),
        }
    }

    /// Convert to the JSON value placed in outbound payloads
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for DetectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DetectedValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for DetectedValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for DetectedValue {
    fn from(n: i64) -> Self {
        Self::int(n)
    }
}

impl From<f64> for DetectedValue {
    fn from(f: f64) -> Self {
        Self::float(f)
    }
}

/// Named detection result
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Field name (key into `FieldMapping`)
    pub name: String,

    /// Detected value
    pub value: DetectedValue,

    /// Detection state
    pub state: ResultState,
}

impl DetectionResult {
    pub fn new(name: impl Into<String>, value: impl Into<DetectedValue>, state: ResultState) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            state,
        }
    }

    /// Shorthand for a `Success` result
    pub fn success(name: impl Into<String>, value: impl Into<DetectedValue>) -> Self {
        Self::new(name, value, ResultState::Success)
    }
}
