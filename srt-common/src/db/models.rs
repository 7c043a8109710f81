//! Database models

use serde::{Deserialize, Serialize};

/// One confirmed score row as stored in the `scores` table
///
/// `value_json` holds the raw rater input exactly as submitted (string,
/// number, boolean or null) so the read path can normalize it the same way
/// it normalizes local edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub school_id: String,
    pub indicator_code: String,
    pub column_key: String,
    pub value_json: String,
    pub source_tag: String,
}

impl From<(String, String, String, String, String)> for ScoreRow {
    fn from(row: (String, String, String, String, String)) -> Self {
        Self {
            school_id: row.0,
            indicator_code: row.1,
            column_key: row.2,
            value_json: row.3,
            source_tag: row.4,
        }
    }
}
