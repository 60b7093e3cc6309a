use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a metric has no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Unknown {
    /// The provider call that would have answered failed.
    Upstream(String),
    /// The call succeeded but no candidate field held a usable number.
    NotReported,
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unknown::Upstream(msg) => write!(f, "upstream unavailable: {msg}"),
            Unknown::NotReported => f.write_str("not reported"),
        }
    }
}

/// A reconciled figure: a finite number, or an explicit unknown that is never
/// confused with zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Metric {
    Known(f64),
    Unknown(Unknown),
}

impl Metric {
    /// Wraps a value, turning NaN/infinite inputs into `NotReported`.
    pub fn known(value: f64) -> Self {
        if value.is_finite() {
            Metric::Known(value)
        } else {
            Metric::Unknown(Unknown::NotReported)
        }
    }

    pub fn not_reported() -> Self {
        Metric::Unknown(Unknown::NotReported)
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Metric::Unknown(Unknown::Upstream(msg.into()))
    }

    pub fn from_option(value: Option<f64>) -> Self {
        value.map(Metric::known).unwrap_or_else(Metric::not_reported)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Known(v) => Some(*v),
            Metric::Unknown(_) => None,
        }
    }

    /// Value for arithmetic; unknown counts as zero.
    pub fn or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Metric::Known(_))
    }

    /// Known and strictly non-zero.
    pub fn non_zero(&self) -> Option<f64> {
        self.value().filter(|v| *v != 0.0)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Metric::Known(v) => Metric::known(f(v)),
            unknown => unknown,
        }
    }

    /// Formats a known value with `f`, or "TBD".
    pub fn display_with(&self, f: impl FnOnce(f64) -> String) -> String {
        match self {
            Metric::Known(v) => f(*v),
            Metric::Unknown(_) => "TBD".to_string(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Known(v) => write!(f, "{v:.2}"),
            Metric::Unknown(_) => f.write_str("TBD"),
        }
    }
}
