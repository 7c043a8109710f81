//! SQLite score store tests

use srt_rollup::comment::CommentRecord;
use srt_rollup::model::{ColumnKey, ScoreRecord};
use srt_rollup::normalize::RawValue;
use srt_rollup::store::{ScoreStore, SqliteScoreStore};
use tempfile::TempDir;

fn record(code: &str, column: ColumnKey, value: RawValue, source: &str) -> ScoreRecord {
    ScoreRecord {
        indicator_code: code.to_string(),
        column,
        value,
        source_tag: source.to_string(),
    }
}

fn comment(code: &str, text: &str) -> CommentRecord {
    CommentRecord {
        indicator_code: code.to_string(),
        comment: text.to_string(),
    }
}

async fn memory_store() -> SqliteScoreStore {
    let pool = srt_common::db::init_memory_database()
        .await
        .expect("in-memory database");
    SqliteScoreStore::new(pool)
}

#[tokio::test]
async fn test_upsert_then_fetch_preserves_value_kinds() {
    let store = memory_store().await;
    let batch = vec![
        record("A.1", ColumnKey::Rater(1), RawValue::from("Yes"), "LT1"),
        record("A.1", ColumnKey::Rater(10), RawValue::from(1), "LT10"),
        record("A.1", ColumnKey::Checklist, RawValue::from(true), "Mrs Okafor"),
        record("A.2", ColumnKey::Rater(1), RawValue::Null, "LT1"),
    ];

    assert_eq!(store.upsert_scores("S1", &batch).await.unwrap(), 4);

    let fetched = store.fetch_scores("S1").await.unwrap();
    assert_eq!(fetched.len(), 4);
    for expected in &batch {
        let found = fetched
            .iter()
            .find(|r| r.key() == expected.key())
            .expect("record present");
        assert_eq!(found, expected);
    }
}

#[tokio::test]
async fn test_upsert_overwrites_same_key() {
    let store = memory_store().await;
    store
        .upsert_scores("S1", &[record("A.1", ColumnKey::Rater(2), RawValue::from("yes"), "LT2")])
        .await
        .unwrap();
    store
        .upsert_scores("S1", &[record("A.1", ColumnKey::Rater(2), RawValue::from("no"), "LT2")])
        .await
        .unwrap();

    let fetched = store.fetch_scores("S1").await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].value, RawValue::from("no"));
}

#[tokio::test]
async fn test_schools_are_isolated() {
    let store = memory_store().await;
    store
        .upsert_scores("S1", &[record("A.1", ColumnKey::Rater(1), RawValue::from("yes"), "LT1")])
        .await
        .unwrap();
    store
        .upsert_scores("S2", &[record("A.1", ColumnKey::Rater(1), RawValue::from("no"), "LT1")])
        .await
        .unwrap();

    assert_eq!(store.delete_scores("S1").await.unwrap(), 1);
    assert!(store.fetch_scores("S1").await.unwrap().is_empty());

    let other = store.fetch_scores("S2").await.unwrap();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].value, RawValue::from("no"));
}

#[tokio::test]
async fn test_delete_on_empty_school_is_zero() {
    let store = memory_store().await;
    assert_eq!(store.delete_scores("nobody").await.unwrap(), 0);
}

#[tokio::test]
async fn test_scores_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("srt.db");

    {
        let pool = srt_common::db::init_database(&db_path).await.unwrap();
        let store = SqliteScoreStore::new(pool.clone());
        store
            .upsert_scores("S1", &[record("B.3", ColumnKey::Checklist, RawValue::from("nr"), "Checklist")])
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = srt_common::db::init_database(&db_path).await.unwrap();
    let store = SqliteScoreStore::new(pool);
    let fetched = store.fetch_scores("S1").await.unwrap();

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].column, ColumnKey::Checklist);
    assert_eq!(fetched[0].value, RawValue::from("nr"));
}

#[tokio::test]
async fn test_comment_upsert_overwrites_and_empty_deletes() {
    let store = memory_store().await;
    store
        .upsert_comments("S1", &[comment("A.1", "first"), comment("A.2", "kept")])
        .await
        .unwrap();
    store
        .upsert_comments("S1", &[comment("A.1", "revised"), comment("A.2", "")])
        .await
        .unwrap();

    assert_eq!(
        store.fetch_comments("S1").await.unwrap(),
        vec![comment("A.1", "revised")]
    );
}

#[tokio::test]
async fn test_comments_are_scoped_by_school() {
    let store = memory_store().await;
    store.upsert_comments("S1", &[comment("A.1", "one")]).await.unwrap();
    store.upsert_comments("S2", &[comment("A.1", "two")]).await.unwrap();

    assert_eq!(store.delete_comments("S1").await.unwrap(), 1);
    assert!(store.fetch_comments("S1").await.unwrap().is_empty());
    assert_eq!(store.fetch_comments("S2").await.unwrap(), vec![comment("A.1", "two")]);

    // Scores are untouched by comment deletes
    assert_eq!(store.delete_scores("S2").await.unwrap(), 0);
}
