//! Value normalizer
//!
//! Rater input arrives in many shapes: `"Yes"`, `" no "`, `1`, `true`,
//! `"N/A"`, `null`. Everything is mapped onto four canonical states.
//! Unrecognized input is not an error: it degrades to [`NormalizedValue::Unset`].

use serde::{Deserialize, Serialize};

/// A raw observation value of unknown shape
///
/// Deserializes untagged from JSON, so `"yes"`, `1`, `true` and `null` are all
/// accepted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Null or whitespace-only text
    ///
    /// Blank values never shadow anything: the collector skips them and
    /// falls back to the next source.
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Number(f64::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// Canonical observation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedValue {
    Achieved,
    NotAchieved,
    NotApplicable,
    Unset,
}

impl NormalizedValue {
    pub fn is_set(self) -> bool {
        self != NormalizedValue::Unset
    }

    /// Canonical raw encoding (`"yes"`, `"no"`, `"nr"`, `null`)
    ///
    /// `normalize(&v.canonical()) == v` for every state.
    pub fn canonical(self) -> RawValue {
        match self {
            NormalizedValue::Achieved => RawValue::from("yes"),
            NormalizedValue::NotAchieved => RawValue::from("no"),
            NormalizedValue::NotApplicable => RawValue::from("nr"),
            NormalizedValue::Unset => RawValue::Null,
        }
    }
}

impl From<NormalizedValue> for RawValue {
    fn from(value: NormalizedValue) -> Self {
        value.canonical()
    }
}

/// Map a raw value onto the canonical domain
///
/// | input                                   | result        |
/// |-----------------------------------------|---------------|
/// | `"yes"`, `"1"`, `"true"`, `1`, `true`   | Achieved      |
/// | `"no"`, `"0"`, `"false"`, `0`, `false`  | NotAchieved   |
/// | `"nr"`, `"na"`, `"n/a"`                 | NotApplicable |
/// | anything else, blank, `null`            | Unset         |
///
/// Strings are compared case- and whitespace-insensitively.
pub fn normalize(raw: &RawValue) -> NormalizedValue {
    match raw {
        RawValue::Null => NormalizedValue::Unset,
        RawValue::Bool(true) => NormalizedValue::Achieved,
        RawValue::Bool(false) => NormalizedValue::NotAchieved,
        RawValue::Number(n) if *n == 1.0 => NormalizedValue::Achieved,
        RawValue::Number(n) if *n == 0.0 => NormalizedValue::NotAchieved,
        RawValue::Number(_) => NormalizedValue::Unset,
        RawValue::Text(s) => normalize_text(s),
    }
}

fn normalize_text(s: &str) -> NormalizedValue {
    match s.trim().to_lowercase().as_str() {
        "yes" | "1" | "true" => NormalizedValue::Achieved,
        "no" | "0" | "false" => NormalizedValue::NotAchieved,
        "nr" | "na" | "n/a" => NormalizedValue::NotApplicable,
        _ => NormalizedValue::Unset,
    }
}
