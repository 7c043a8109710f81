//! Persistence service abstraction
//!
//! The confirmed score store is a black box with three operations scoped by
//! school: fetch everything, upsert a batch, delete everything. Upserts
//! overwrite per (indicator, column) key, so retrying a batch is harmless.
//! Indicator comments get the same three operations, keyed by indicator.

pub mod memory;
pub mod sqlite;

use crate::comment::CommentRecord;
use crate::model::ScoreRecord;
use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryScoreStore;
pub use sqlite::SqliteScoreStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Service could not be reached; nothing was written
    #[error("persistence service unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Every confirmed score for `school_id`
    async fn fetch_scores(&self, school_id: &str) -> Result<Vec<ScoreRecord>, StoreError>;

    /// Write `batch` atomically; returns the number of records written
    async fn upsert_scores(&self, school_id: &str, batch: &[ScoreRecord]) -> Result<usize, StoreError>;

    /// Remove every confirmed score for `school_id`; returns rows removed
    async fn delete_scores(&self, school_id: &str) -> Result<u64, StoreError>;

    /// Every confirmed comment for `school_id`
    async fn fetch_comments(&self, school_id: &str) -> Result<Vec<CommentRecord>, StoreError>;

    /// Write `batch` atomically; an empty comment deletes the stored one
    async fn upsert_comments(&self, school_id: &str, batch: &[CommentRecord]) -> Result<usize, StoreError>;

    /// Remove every comment for `school_id`; returns rows removed
    async fn delete_comments(&self, school_id: &str) -> Result<u64, StoreError>;
}
