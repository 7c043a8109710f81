//! In-memory score store
//!
//! Used for `--memory` runs and tests. Can be switched unavailable to
//! simulate a dropped connection.

use super::{ScoreStore, StoreError};
use crate::comment::CommentRecord;
use crate::model::{ScoreKey, ScoreRecord};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryScoreStore {
    schools: Mutex<HashMap<String, HashMap<ScoreKey, ScoreRecord>>>,
    comments: Mutex<HashMap<String, BTreeMap<String, String>>>,
    unavailable: AtomicBool,
    upsert_calls: AtomicUsize,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed confirmed scores without counting as an upsert call
    pub async fn seed(&self, school_id: &str, records: impl IntoIterator<Item = ScoreRecord>) {
        let mut schools = self.schools.lock().await;
        let rows = schools.entry(school_id.to_string()).or_default();
        for record in records {
            rows.insert(record.key(), record);
        }
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of upsert calls received, successful or not
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store switched offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn fetch_scores(&self, school_id: &str) -> Result<Vec<ScoreRecord>, StoreError> {
        self.check_available()?;
        let schools = self.schools.lock().await;
        let mut records: Vec<ScoreRecord> = schools
            .get(school_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.key());
        Ok(records)
    }

    async fn upsert_scores(&self, school_id: &str, batch: &[ScoreRecord]) -> Result<usize, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut schools = self.schools.lock().await;
        let rows = schools.entry(school_id.to_string()).or_default();
        for record in batch {
            rows.insert(record.key(), record.clone());
        }
        Ok(batch.len())
    }

    async fn delete_scores(&self, school_id: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut schools = self.schools.lock().await;
        Ok(schools.remove(school_id).map_or(0, |rows| rows.len() as u64))
    }

    async fn fetch_comments(&self, school_id: &str) -> Result<Vec<CommentRecord>, StoreError> {
        self.check_available()?;
        let comments = self.comments.lock().await;
        Ok(comments
            .get(school_id)
            .map(|rows| {
                rows.iter()
                    .map(|(code, comment)| CommentRecord {
                        indicator_code: code.clone(),
                        comment: comment.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_comments(&self, school_id: &str, batch: &[CommentRecord]) -> Result<usize, StoreError> {
        self.check_available()?;
        let mut comments = self.comments.lock().await;
        let rows = comments.entry(school_id.to_string()).or_default();
        for record in batch {
            if record.is_removal() {
                rows.remove(&record.indicator_code);
            } else {
                rows.insert(record.indicator_code.clone(), record.comment.clone());
            }
        }
        Ok(batch.len())
    }

    async fn delete_comments(&self, school_id: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut comments = self.comments.lock().await;
        Ok(comments.remove(school_id).map_or(0, |rows| rows.len() as u64))
    }
}
