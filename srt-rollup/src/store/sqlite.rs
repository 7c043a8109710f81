//! SQLite-backed score store
//!
//! Rows live in the `scores` and `comments` tables created by
//! `srt_common::db::create_schema`. Values are kept as JSON text so string,
//! number, boolean and null inputs survive unchanged.

use super::{ScoreStore, StoreError};
use crate::comment::CommentRecord;
use crate::model::{ColumnKey, ScoreRecord};
use crate::normalize::RawValue;
use async_trait::async_trait;
use sqlx::SqlitePool;
use srt_common::db::ScoreRow;
use tracing::{debug, info};

pub struct SqliteScoreStore {
    pool: SqlitePool,
}

impl SqliteScoreStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_row(row: ScoreRow) -> Result<ScoreRecord, StoreError> {
    let column: ColumnKey = row
        .column_key
        .parse()
        .map_err(|e| StoreError::Decode(format!("{}", e)))?;
    let value: RawValue = serde_json::from_str(&row.value_json)
        .map_err(|e| StoreError::Decode(format!("{}/{}: {}", row.indicator_code, row.column_key, e)))?;

    Ok(ScoreRecord {
        indicator_code: row.indicator_code,
        column,
        value,
        source_tag: row.source_tag,
    })
}

#[async_trait]
impl ScoreStore for SqliteScoreStore {
    async fn fetch_scores(&self, school_id: &str) -> Result<Vec<ScoreRecord>, StoreError> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT school_id, indicator_code, column_key, value_json, source_tag
            FROM scores
            WHERE school_id = ?
            ORDER BY indicator_code, column_key
            "#,
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(school_id, rows = rows.len(), "Fetched confirmed scores");
        rows.into_iter().map(ScoreRow::from).map(decode_row).collect()
    }

    async fn upsert_scores(&self, school_id: &str, batch: &[ScoreRecord]) -> Result<usize, StoreError> {
        let updated_at = srt_common::time::to_millis(srt_common::time::now());
        let mut tx = self.pool.begin().await?;

        for record in batch {
            let value_json = serde_json::to_string(&record.value)
                .map_err(|e| StoreError::Decode(e.to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO scores (school_id, indicator_code, column_key, value_json, source_tag, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(school_id, indicator_code, column_key) DO UPDATE SET
                    value_json = excluded.value_json,
                    source_tag = excluded.source_tag,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(school_id)
            .bind(&record.indicator_code)
            .bind(record.column.to_string())
            .bind(value_json)
            .bind(&record.source_tag)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(school_id, count = batch.len(), "Upserted score batch");
        Ok(batch.len())
    }

    async fn delete_scores(&self, school_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM scores WHERE school_id = ?")
            .bind(school_id)
            .execute(&self.pool)
            .await?;

        info!(school_id, rows = result.rows_affected(), "Deleted confirmed scores");
        Ok(result.rows_affected())
    }

    async fn fetch_comments(&self, school_id: &str) -> Result<Vec<CommentRecord>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT indicator_code, comment FROM comments WHERE school_id = ? ORDER BY indicator_code",
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(school_id, rows = rows.len(), "Fetched comments");
        Ok(rows
            .into_iter()
            .map(|(indicator_code, comment)| CommentRecord {
                indicator_code,
                comment,
            })
            .collect())
    }

    async fn upsert_comments(&self, school_id: &str, batch: &[CommentRecord]) -> Result<usize, StoreError> {
        let updated_at = srt_common::time::to_millis(srt_common::time::now());
        let mut tx = self.pool.begin().await?;

        for record in batch {
            if record.is_removal() {
                sqlx::query("DELETE FROM comments WHERE school_id = ? AND indicator_code = ?")
                    .bind(school_id)
                    .bind(&record.indicator_code)
                    .execute(&mut *tx)
                    .await?;
                continue;
            }

            sqlx::query(
                r#"
                INSERT INTO comments (school_id, indicator_code, comment, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(school_id, indicator_code) DO UPDATE SET
                    comment = excluded.comment,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(school_id)
            .bind(&record.indicator_code)
            .bind(&record.comment)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(school_id, count = batch.len(), "Upserted comment batch");
        Ok(batch.len())
    }

    async fn delete_comments(&self, school_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE school_id = ?")
            .bind(school_id)
            .execute(&self.pool)
            .await?;

        info!(school_id, rows = result.rows_affected(), "Deleted comments");
        Ok(result.rows_affected())
    }
}
