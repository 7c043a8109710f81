//! Score keys and records shared by the read and write paths

use crate::normalize::{NormalizedValue, RawValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of rater columns per indicator (LT1..LT10)
pub const RATER_COLUMNS: u8 = 10;

/// Source label used for checklist values that carry no source tag
pub const DEFAULT_CHECKLIST_LABEL: &str = "Checklist";

/// Column a score was entered in
///
/// Serialized as its display form: `"LT1"`..`"LT10"` or `"CHECKLIST"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnKey {
    /// Leadership-team rater column, 1-based
    Rater(u8),
    /// Single checklist column with an arbitrary source tag
    Checklist,
}

impl ColumnKey {
    /// Rater column `n`; None outside 1..=10
    pub fn rater(n: u8) -> Option<Self> {
        (1..=RATER_COLUMNS).contains(&n).then_some(ColumnKey::Rater(n))
    }

    /// Rater columns in evaluation order
    pub fn raters() -> impl Iterator<Item = ColumnKey> {
        (1..=RATER_COLUMNS).filter_map(ColumnKey::rater)
    }

    pub fn is_rater(self) -> bool {
        matches!(self, ColumnKey::Rater(_))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Rater(n) => write!(f, "LT{}", n),
            ColumnKey::Checklist => f.write_str("CHECKLIST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid column key '{0}' (expected LT1..LT10 or CHECKLIST)")]
pub struct InvalidColumnKey(pub String);

impl FromStr for ColumnKey {
    type Err = InvalidColumnKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "CHECKLIST" {
            return Ok(ColumnKey::Checklist);
        }
        upper
            .strip_prefix("LT")
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(ColumnKey::rater)
            .ok_or_else(|| InvalidColumnKey(s.to_string()))
    }
}

impl TryFrom<String> for ColumnKey {
    type Error = InvalidColumnKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnKey> for String {
    fn from(value: ColumnKey) -> Self {
        value.to_string()
    }
}

/// Identity of one cell: an indicator in a given column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScoreKey {
    pub indicator_code: String,
    pub column: ColumnKey,
}

impl ScoreKey {
    pub fn new(indicator_code: impl Into<String>, column: ColumnKey) -> Self {
        Self {
            indicator_code: indicator_code.into(),
            column,
        }
    }
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.indicator_code, self.column)
    }
}

/// A score as exchanged with the persistence service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub indicator_code: String,
    pub column: ColumnKey,
    pub value: RawValue,
    /// Rater or checklist source that entered the value
    pub source_tag: String,
}

impl ScoreRecord {
    pub fn key(&self) -> ScoreKey {
        ScoreKey::new(self.indicator_code.clone(), self.column)
    }
}

/// One normalized observation feeding an indicator verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub source_label: String,
    /// Column the value was read from
    pub column: ColumnKey,
    pub value: NormalizedValue,
}
