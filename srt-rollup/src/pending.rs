//! Pending edit store
//!
//! Local, not-yet-committed rater edits keyed by (indicator code, column).
//! A pending edit shadows the confirmed value for its key until a flush
//! commits it or the rater discards it. Repeated edits to one key overwrite
//! in place, so the store never holds two entries for the same cell.
//!
//! Each stage bumps a store-wide revision counter. A flush records the
//! revisions it sent and clears only those, so an edit re-staged while the
//! commit was in flight survives it.
//!
//! Indicator comments are staged here too, one per indicator code. They
//! carry no source tag and go out with whichever source flushes next.

use crate::comment::{sanitize_comment, CommentRecord};
use crate::model::{ColumnKey, ScoreKey, ScoreRecord};
use crate::normalize::RawValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Time source for edit timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        srt_common::time::now()
    }
}

/// Clock that only moves when told to
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEdit {
    pub indicator_code: String,
    pub column: ColumnKey,
    pub value: RawValue,
    pub source_tag: String,
    pub timestamp: DateTime<Utc>,
    pub revision: u64,
}

impl PendingEdit {
    pub fn key(&self) -> ScoreKey {
        ScoreKey::new(self.indicator_code.clone(), self.column)
    }

    /// The record a flush sends for this edit
    pub fn to_record(&self) -> ScoreRecord {
        ScoreRecord {
            indicator_code: self.indicator_code.clone(),
            column: self.column,
            value: self.value.clone(),
            source_tag: self.source_tag.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingComment {
    pub indicator_code: String,
    /// Empty when the comment is being removed
    pub comment: String,
    pub timestamp: DateTime<Utc>,
    pub revision: u64,
}

impl PendingComment {
    pub fn to_record(&self) -> CommentRecord {
        CommentRecord {
            indicator_code: self.indicator_code.clone(),
            comment: self.comment.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PendingFileError {
    #[error("pending edit snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("pending edit snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk form of the store
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    edits: Vec<PendingEdit>,
    #[serde(default)]
    comments: Vec<PendingComment>,
}

pub struct PendingEditStore {
    edits: BTreeMap<ScoreKey, PendingEdit>,
    comments: BTreeMap<String, PendingComment>,
    next_revision: u64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PendingEditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEditStore")
            .field("edits", &self.edits.len())
            .field("comments", &self.comments.len())
            .field("next_revision", &self.next_revision)
            .finish()
    }
}

impl Default for PendingEditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingEditStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            edits: BTreeMap::new(),
            comments: BTreeMap::new(),
            next_revision: 1,
            clock,
        }
    }

    /// Upsert an edit, replacing any prior value for the same key
    ///
    /// The source tag of the latest edit wins.
    pub fn stage(
        &mut self,
        indicator_code: &str,
        column: ColumnKey,
        value: RawValue,
        source_tag: &str,
    ) -> &PendingEdit {
        let revision = self.bump_revision();

        let key = ScoreKey::new(indicator_code, column);
        debug!(key = %key, source_tag, revision, "Staging edit");

        let edit = PendingEdit {
            indicator_code: indicator_code.to_string(),
            column,
            value,
            source_tag: source_tag.to_string(),
            timestamp: self.clock.now(),
            revision,
        };
        match self.edits.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(edit);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(edit),
        }
    }

    pub fn get(&self, indicator_code: &str, column: ColumnKey) -> Option<&RawValue> {
        self.get_edit(&ScoreKey::new(indicator_code, column))
            .map(|e| &e.value)
    }

    pub fn get_edit(&self, key: &ScoreKey) -> Option<&PendingEdit> {
        self.edits.get(key)
    }

    pub fn count_for_source(&self, source_tag: &str) -> usize {
        self.edits
            .values()
            .filter(|e| e.source_tag == source_tag)
            .count()
    }

    /// Pending entry count per source tag
    pub fn counts_by_source(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for edit in self.edits.values() {
            *counts.entry(edit.source_tag.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Snapshot of every entry tagged with `source_tag`, in key order
    pub fn entries_for_source(&self, source_tag: &str) -> Vec<PendingEdit> {
        self.edits
            .values()
            .filter(|e| e.source_tag == source_tag)
            .cloned()
            .collect()
    }

    /// Drop every entry tagged with `source_tag`; returns how many
    pub fn discard_all(&mut self, source_tag: &str) -> usize {
        let before = self.edits.len();
        self.edits.retain(|_, e| e.source_tag != source_tag);
        before - self.edits.len()
    }

    /// Remove the entries a flush committed
    ///
    /// An entry is removed only if its revision still matches the one sent;
    /// later edits to the same key stay pending.
    pub fn clear_flushed(&mut self, flushed: &[PendingEdit]) -> usize {
        let sent: HashMap<ScoreKey, u64> = flushed.iter().map(|e| (e.key(), e.revision)).collect();
        let before = self.edits.len();
        self.edits
            .retain(|key, e| sent.get(key).map_or(true, |&rev| rev != e.revision));
        before - self.edits.len()
    }

    /// Stage a comment for an indicator, replacing any pending one
    ///
    /// The text is trimmed and capped; an empty result stages a removal.
    pub fn stage_comment(&mut self, indicator_code: &str, comment: &str) -> &PendingComment {
        let revision = self.bump_revision();
        debug!(indicator_code, revision, "Staging comment");

        let pending = PendingComment {
            indicator_code: indicator_code.to_string(),
            comment: sanitize_comment(comment),
            timestamp: self.clock.now(),
            revision,
        };
        match self.comments.entry(indicator_code.to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(pending);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(pending),
        }
    }

    pub fn get_comment(&self, indicator_code: &str) -> Option<&PendingComment> {
        self.comments.get(indicator_code)
    }

    /// Every pending comment, in indicator code order
    pub fn comment_entries(&self) -> Vec<PendingComment> {
        self.comments.values().cloned().collect()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Remove the comments a flush committed, matching by revision
    pub fn clear_flushed_comments(&mut self, flushed: &[PendingComment]) -> usize {
        let sent: HashMap<&str, u64> = flushed
            .iter()
            .map(|c| (c.indicator_code.as_str(), c.revision))
            .collect();
        let before = self.comments.len();
        self.comments
            .retain(|code, c| sent.get(code.as_str()).map_or(true, |&rev| rev != c.revision));
        before - self.comments.len()
    }

    /// Drop every pending edit and comment
    pub fn clear(&mut self) {
        self.edits.clear();
        self.comments.clear();
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// No pending edits and no pending comments
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.comments.is_empty()
    }

    fn bump_revision(&mut self) -> u64 {
        let revision = self.next_revision;
        self.next_revision += 1;
        revision
    }

    /// Write every entry to `path` as JSON
    ///
    /// Writes to a sibling temp file first and renames it over the target.
    pub fn save_to_file(&self, path: &Path) -> Result<(), PendingFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = Snapshot {
            edits: self.edits.values().cloned().collect(),
            comments: self.comment_entries(),
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Restore a store saved with [`save_to_file`](Self::save_to_file)
    ///
    /// A missing file is an empty store.
    pub fn load_from_file(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, PendingFileError> {
        let mut store = Self::with_clock(clock);
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;

        for edit in snapshot.edits {
            store.next_revision = store.next_revision.max(edit.revision + 1);
            store.edits.insert(edit.key(), edit);
        }
        for comment in snapshot.comments {
            store.next_revision = store.next_revision.max(comment.revision + 1);
            store.comments.insert(comment.indicator_code.clone(), comment);
        }
        Ok(store)
    }
}
