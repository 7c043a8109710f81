//! Data point collector
//!
//! Gathers the observations for one indicator: rater columns LT1..LT10 in
//! order, then the checklist column. For every cell a non-blank pending edit
//! wins over the confirmed value; blank pending values fall back to it.

use crate::model::{ColumnKey, DataPoint, ScoreKey, DEFAULT_CHECKLIST_LABEL};
use crate::normalize::{normalize, RawValue};
use crate::pending::PendingEditStore;
use crate::remote::RemoteScores;

/// Read access to the two value layers
pub trait ScoreLookup {
    /// Locally staged value and its source tag
    fn pending(&self, key: &ScoreKey) -> Option<(&RawValue, &str)>;

    /// Value confirmed by the persistence service and its source tag
    fn confirmed(&self, key: &ScoreKey) -> Option<(&RawValue, &str)>;
}

/// Borrowed view over pending edits layered on confirmed scores
pub struct ReadModel<'a> {
    pub pending: &'a PendingEditStore,
    pub remote: &'a RemoteScores,
}

impl<'a> ReadModel<'a> {
    pub fn new(pending: &'a PendingEditStore, remote: &'a RemoteScores) -> Self {
        Self { pending, remote }
    }
}

impl ScoreLookup for ReadModel<'_> {
    fn pending(&self, key: &ScoreKey) -> Option<(&RawValue, &str)> {
        self.pending
            .get_edit(key)
            .map(|e| (&e.value, e.source_tag.as_str()))
    }

    fn confirmed(&self, key: &ScoreKey) -> Option<(&RawValue, &str)> {
        self.remote
            .get(key)
            .map(|r| (&r.value, r.source_tag.as_str()))
    }
}

/// Effective value for a cell: non-blank pending first, then confirmed
fn effective<'l, L: ScoreLookup>(lookup: &'l L, key: &ScoreKey) -> Option<(&'l RawValue, &'l str)> {
    lookup
        .pending(key)
        .filter(|(v, _)| !v.is_blank())
        .or_else(|| lookup.confirmed(key).filter(|(v, _)| !v.is_blank()))
}

/// Collect every set data point for `indicator_code`
///
/// Rater points are labelled by column (`"LT3"`); the checklist point by its
/// source tag, or `"Checklist"` if the tag is empty. Values that normalize
/// to Unset are skipped.
pub fn collect_data_points<L: ScoreLookup>(lookup: &L, indicator_code: &str) -> Vec<DataPoint> {
    let mut points = Vec::new();

    for column in ColumnKey::raters() {
        let key = ScoreKey::new(indicator_code, column);
        if let Some((raw, _)) = effective(lookup, &key) {
            let value = normalize(raw);
            if value.is_set() {
                points.push(DataPoint {
                    source_label: column.to_string(),
                    column,
                    value,
                });
            }
        }
    }

    let key = ScoreKey::new(indicator_code, ColumnKey::Checklist);
    if let Some((raw, source_tag)) = effective(lookup, &key) {
        let value = normalize(raw);
        if value.is_set() {
            let label = if source_tag.trim().is_empty() {
                DEFAULT_CHECKLIST_LABEL.to_string()
            } else {
                source_tag.to_string()
            };
            points.push(DataPoint {
                source_label: label,
                column: ColumnKey::Checklist,
                value,
            });
        }
    }

    points
}
