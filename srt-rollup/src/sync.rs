//! Sync coordinator
//!
//! Commits a source's pending edits to the persistence service as one batch.
//!
//! **Per-source state machine:**
//! ```text
//! Idle / Succeeded / Failed ──flush──> Flushing ──ok──> Succeeded
//!                                          └────err──> Failed
//! ```
//! Succeeded and Failed are resting states; a new flush may start from any
//! of them. A second flush for a source already Flushing is rejected.
//!
//! Every pending comment rides along with the flush, whichever source it is
//! for. Scores are written first, then comments.
//!
//! On success only the exact revisions that were sent are cleared from the
//! pending store, and the committed records are written through to the
//! confirmed cache. On failure nothing local changes: the edits and comments
//! stay pending and a retry resends the same batch. Both writes overwrite per
//! key, so a retry after a partial commit is harmless.
//!
//! Refresh and reset replace or clear shared state wholesale, so they run
//! exclusively: never while a flush is in flight, and flushes are refused
//! while one of them runs.

use crate::locks::{lock, read, write};
use crate::comment::CommentRecord;
use crate::model::ScoreRecord;
use crate::pending::{Clock, PendingComment, PendingEdit, PendingEditStore};
use crate::remote::RemoteScores;
use crate::store::{ScoreStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use srt_common::{EventBus, SrtEvent};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Sync status of one source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Flushing {
        batch_id: Uuid,
        count: usize,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        batch_id: Uuid,
        count: usize,
        at: DateTime<Utc>,
    },
    Failed {
        batch_id: Uuid,
        offline: bool,
        message: String,
        at: DateTime<Utc>,
    },
}

impl SyncPhase {
    pub fn is_flushing(&self) -> bool {
        matches!(self, SyncPhase::Flushing { .. })
    }
}

/// Whole-state operation that excludes flushes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maintenance {
    Refresh,
    Reset,
}

impl fmt::Display for Maintenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maintenance::Refresh => f.write_str("refresh"),
            Maintenance::Reset => f.write_str("reset"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("a flush for source '{0}' is already in flight")]
    AlreadyFlushing(String),

    #[error("cannot flush while a {0} is running")]
    Busy(Maintenance),

    /// Commit failed while connectivity was down; edits are kept
    #[error("offline: {count} edit(s) for '{source_tag}' kept locally: {source}")]
    Offline {
        source_tag: String,
        count: usize,
        #[source]
        source: StoreError,
    },

    /// Commit failed while online; edits are kept
    #[error("commit of {count} edit(s) for '{source_tag}' failed: {source}")]
    Store {
        source_tag: String,
        count: usize,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("a flush for source '{0}' is in flight")]
    FlushInFlight(String),

    #[error("a {0} is already running")]
    Busy(Maintenance),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a successful flush
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlushReport {
    pub source_tag: String,
    /// Edits committed; 0 when nothing was pending
    pub count: usize,
    /// Comments committed alongside the edits
    pub comments: usize,
    /// None when nothing was sent
    pub batch_id: Option<Uuid>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Snapshot for sync status displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncState {
    pub is_online: bool,
    /// Any source currently flushing
    pub is_syncing: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub pending_count_by_source: BTreeMap<String, usize>,
    pub pending_comments: usize,
    pub sources: BTreeMap<String, SyncPhase>,
}

#[derive(Default)]
struct Activity {
    phases: HashMap<String, SyncPhase>,
    maintenance: Option<Maintenance>,
}

impl Activity {
    fn flushing_source(&self) -> Option<&str> {
        self.phases
            .iter()
            .find(|(_, phase)| phase.is_flushing())
            .map(|(source, _)| source.as_str())
    }
}

/// Marks a source Failed if its flush future is dropped before finishing
struct InFlight<'a> {
    activity: &'a Mutex<Activity>,
    clock: &'a dyn Clock,
    source_tag: &'a str,
    batch_id: Uuid,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self, phase: SyncPhase) {
        lock(self.activity)
            .phases
            .insert(self.source_tag.to_string(), phase);
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(source_tag = self.source_tag, batch_id = %self.batch_id, "Flush abandoned before completion");
            lock(self.activity).phases.insert(
                self.source_tag.to_string(),
                SyncPhase::Failed {
                    batch_id: self.batch_id,
                    offline: false,
                    message: "flush abandoned before completion".to_string(),
                    at: self.clock.now(),
                },
            );
        }
    }
}

/// Clears the maintenance flag when dropped
struct MaintenanceGuard<'a> {
    activity: &'a Mutex<Activity>,
}

impl Drop for MaintenanceGuard<'_> {
    fn drop(&mut self) {
        lock(self.activity).maintenance = None;
    }
}

pub struct SyncCoordinator {
    school_id: String,
    store: Arc<dyn ScoreStore>,
    pending: Arc<RwLock<PendingEditStore>>,
    remote: Arc<RwLock<RemoteScores>>,
    activity: Mutex<Activity>,
    last_sync_time: Mutex<Option<DateTime<Utc>>>,
    online: AtomicBool,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    pub fn new(
        school_id: impl Into<String>,
        store: Arc<dyn ScoreStore>,
        pending: Arc<RwLock<PendingEditStore>>,
        remote: Arc<RwLock<RemoteScores>>,
        events: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            school_id: school_id.into(),
            store,
            pending,
            remote,
            activity: Mutex::new(Activity::default()),
            last_sync_time: Mutex::new(None),
            online: AtomicBool::new(true),
            events,
            clock,
        }
    }

    pub fn school_id(&self) -> &str {
        &self.school_id
    }

    /// Commit every pending edit tagged `source_tag`, plus every pending
    /// comment, as one batch
    ///
    /// Nothing pending: succeeds with count 0, no remote call, and
    /// `last_sync_time` unchanged. The call is attempted even when marked
    /// offline; the connectivity flag only classifies a failure.
    pub async fn flush(&self, source_tag: &str) -> Result<FlushReport, FlushError> {
        let (batch, comments, batch_id) = {
            let mut activity = lock(&self.activity);
            if let Some(op) = activity.maintenance {
                return Err(FlushError::Busy(op));
            }
            if activity
                .phases
                .get(source_tag)
                .is_some_and(SyncPhase::is_flushing)
            {
                warn!(source_tag, "Flush rejected: already in flight");
                return Err(FlushError::AlreadyFlushing(source_tag.to_string()));
            }

            let (batch, comments) = {
                let pending = read(&self.pending);
                (pending.entries_for_source(source_tag), pending.comment_entries())
            };
            if batch.is_empty() && comments.is_empty() {
                debug!(source_tag, "Nothing pending to flush");
                return Ok(FlushReport {
                    source_tag: source_tag.to_string(),
                    count: 0,
                    comments: 0,
                    batch_id: None,
                    synced_at: None,
                });
            }

            let batch_id = Uuid::new_v4();
            activity.phases.insert(
                source_tag.to_string(),
                SyncPhase::Flushing {
                    batch_id,
                    count: batch.len(),
                    started_at: self.clock.now(),
                },
            );
            (batch, comments, batch_id)
        };

        let in_flight = InFlight {
            activity: &self.activity,
            clock: self.clock.as_ref(),
            source_tag,
            batch_id,
            finished: false,
        };
        let count = batch.len();
        let comment_count = comments.len();

        info!(source_tag, %batch_id, count, comments = comment_count, "Flushing pending edits");
        self.events.emit_lossy(SrtEvent::FlushStarted {
            source_tag: source_tag.to_string(),
            batch_id,
            count,
            timestamp: self.clock.now(),
        });

        let records: Vec<ScoreRecord> = batch.iter().map(PendingEdit::to_record).collect();
        let comment_records: Vec<CommentRecord> =
            comments.iter().map(PendingComment::to_record).collect();
        let was_online = self.is_online();

        match self.commit(&records, &comment_records).await {
            Ok(()) => {
                let cleared = {
                    let mut pending = write(&self.pending);
                    pending.clear_flushed_comments(&comments);
                    pending.clear_flushed(&batch)
                };
                {
                    let mut remote = write(&self.remote);
                    remote.apply(records);
                    remote.apply_comments(comment_records);
                }

                let at = self.clock.now();
                *lock(&self.last_sync_time) = Some(at);
                in_flight.finish(SyncPhase::Succeeded { batch_id, count, at });

                info!(source_tag, %batch_id, count, comments = comment_count, cleared, "Flush committed");
                self.events.emit_lossy(SrtEvent::FlushSucceeded {
                    source_tag: source_tag.to_string(),
                    batch_id,
                    count,
                    timestamp: at,
                });

                Ok(FlushReport {
                    source_tag: source_tag.to_string(),
                    count,
                    comments: comment_count,
                    batch_id: Some(batch_id),
                    synced_at: Some(at),
                })
            }
            Err(e) => {
                let offline = !was_online || matches!(e, StoreError::Unavailable(_));
                let at = self.clock.now();
                let message = e.to_string();

                in_flight.finish(SyncPhase::Failed {
                    batch_id,
                    offline,
                    message: message.clone(),
                    at,
                });

                if offline {
                    warn!(source_tag, %batch_id, count, error = %e, "Flush failed while offline, edits kept");
                } else {
                    error!(source_tag, %batch_id, count, error = %e, "Flush failed, edits kept");
                }
                self.events.emit_lossy(SrtEvent::FlushFailed {
                    source_tag: source_tag.to_string(),
                    batch_id,
                    offline,
                    message,
                    timestamp: at,
                });

                let source_tag = source_tag.to_string();
                Err(if offline {
                    FlushError::Offline { source_tag, count, source: e }
                } else {
                    FlushError::Store { source_tag, count, source: e }
                })
            }
        }
    }

    async fn commit(&self, records: &[ScoreRecord], comments: &[CommentRecord]) -> Result<(), StoreError> {
        if !records.is_empty() {
            self.store.upsert_scores(&self.school_id, records).await?;
        }
        if !comments.is_empty() {
            self.store.upsert_comments(&self.school_id, comments).await?;
        }
        Ok(())
    }

    pub fn phase(&self, source_tag: &str) -> SyncPhase {
        lock(&self.activity)
            .phases
            .get(source_tag)
            .cloned()
            .unwrap_or(SyncPhase::Idle)
    }

    pub fn is_syncing(&self, source_tag: &str) -> bool {
        self.phase(source_tag).is_flushing()
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        *lock(&self.last_sync_time)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record the connectivity signal; returns true if it changed
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }
        info!(online, "Connectivity changed");
        self.events.emit_lossy(SrtEvent::ConnectivityChanged {
            online,
            timestamp: self.clock.now(),
        });
        true
    }

    pub fn sync_state(&self) -> SyncState {
        let (is_syncing, sources) = {
            let activity = lock(&self.activity);
            let sources: BTreeMap<String, SyncPhase> = activity
                .phases
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (activity.flushing_source().is_some(), sources)
        };

        let (pending_count_by_source, pending_comments) = {
            let pending = read(&self.pending);
            (pending.counts_by_source(), pending.comment_count())
        };

        SyncState {
            is_online: self.is_online(),
            is_syncing,
            last_sync_time: self.last_sync_time(),
            pending_count_by_source,
            pending_comments,
            sources,
        }
    }

    /// Re-read confirmed scores and comments for the school and replace the
    /// cache; returns the number of score records
    pub async fn refresh(&self) -> Result<usize, MaintenanceError> {
        let _guard = self.begin_maintenance(Maintenance::Refresh)?;

        let records = self.store.fetch_scores(&self.school_id).await?;
        let comments = self.store.fetch_comments(&self.school_id).await?;
        let count = records.len();
        {
            let mut remote = write(&self.remote);
            remote.replace(records);
            remote.replace_comments(comments);
        }

        info!(school_id = %self.school_id, records = count, "Confirmed scores refreshed");
        self.events.emit_lossy(SrtEvent::RemoteRefreshed {
            records: count,
            timestamp: self.clock.now(),
        });
        Ok(count)
    }

    /// Delete every confirmed score and comment for the school, then drop all
    /// pending edits, pending comments and the confirmed cache
    ///
    /// Local state is only cleared once both deletes succeed. Returns the
    /// number of score records deleted.
    pub async fn reset(&self) -> Result<u64, MaintenanceError> {
        let _guard = self.begin_maintenance(Maintenance::Reset)?;

        let deleted = self.store.delete_scores(&self.school_id).await?;
        let comments = self.store.delete_comments(&self.school_id).await?;
        debug!(school_id = %self.school_id, comments, "Comments deleted");
        write(&self.pending).clear();
        write(&self.remote).clear();
        lock(&self.activity).phases.clear();

        warn!(school_id = %self.school_id, deleted, "All scores reset");
        self.events.emit_lossy(SrtEvent::ScoresReset {
            school_id: self.school_id.clone(),
            timestamp: self.clock.now(),
        });
        Ok(deleted)
    }

    fn begin_maintenance(&self, op: Maintenance) -> Result<MaintenanceGuard<'_>, MaintenanceError> {
        let mut activity = lock(&self.activity);
        if let Some(running) = activity.maintenance {
            return Err(MaintenanceError::Busy(running));
        }
        if let Some(source) = activity.flushing_source() {
            return Err(MaintenanceError::FlushInFlight(source.to_string()));
        }
        activity.maintenance = Some(op);
        Ok(MaintenanceGuard {
            activity: &self.activity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnKey;
    use crate::normalize::RawValue;
    use crate::pending::ManualClock;
    use crate::store::MemoryScoreStore;
    use chrono::TimeZone;

    struct Fixture {
        store: Arc<MemoryScoreStore>,
        pending: Arc<RwLock<PendingEditStore>>,
        remote: Arc<RwLock<RemoteScores>>,
        events: Arc<EventBus>,
        sync: SyncCoordinator,
    }

    fn fixture() -> Fixture {
        let clock: Arc<dyn Clock> =
            Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap()));
        let store = Arc::new(MemoryScoreStore::new());
        let pending = Arc::new(RwLock::new(PendingEditStore::with_clock(clock.clone())));
        let remote = Arc::new(RwLock::new(RemoteScores::default()));
        let events = Arc::new(EventBus::new(32));
        let sync = SyncCoordinator::new(
            "S1",
            store.clone(),
            pending.clone(),
            remote.clone(),
            events.clone(),
            clock,
        );
        Fixture {
            store,
            pending,
            remote,
            events,
            sync,
        }
    }

    fn stage(f: &Fixture, code: &str, lt: u8, value: &str) {
        f.pending
            .write()
            .unwrap()
            .stage(code, ColumnKey::rater(lt).unwrap(), RawValue::from(value), &format!("LT{}", lt));
    }

    #[tokio::test]
    async fn test_flush_success_clears_source_and_sets_last_sync() {
        let f = fixture();
        stage(&f, "A", 1, "yes");
        stage(&f, "B", 1, "no");
        stage(&f, "A", 2, "yes");

        let report = f.sync.flush("LT1").await.unwrap();

        assert_eq!(report.count, 2);
        assert!(report.batch_id.is_some());
        assert_eq!(f.pending.read().unwrap().count_for_source("LT1"), 0);
        assert_eq!(f.pending.read().unwrap().count_for_source("LT2"), 1);
        assert_eq!(f.sync.last_sync_time(), report.synced_at);
        assert_eq!(f.remote.read().unwrap().len(), 2);
        assert_eq!(f.store.fetch_scores("S1").await.unwrap().len(), 2);
        assert!(matches!(f.sync.phase("LT1"), SyncPhase::Succeeded { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_edits() {
        let f = fixture();
        stage(&f, "A", 1, "yes");
        f.store.set_available(false);

        let result = f.sync.flush("LT1").await;

        assert!(matches!(result, Err(FlushError::Offline { count: 1, .. })));
        assert_eq!(f.pending.read().unwrap().count_for_source("LT1"), 1);
        assert_eq!(f.sync.last_sync_time(), None);
        assert!(f.remote.read().unwrap().is_empty());
        assert!(matches!(f.sync.phase("LT1"), SyncPhase::Failed { offline: true, .. }));

        // Retry from Failed once the service is back
        f.store.set_available(true);
        let report = f.sync.flush("LT1").await.unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(f.pending.read().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_flush_carries_pending_comments() {
        let f = fixture();
        stage(&f, "A", 1, "yes");
        f.pending.write().unwrap().stage_comment("A", "seen in two lessons");

        let report = f.sync.flush("LT1").await.unwrap();

        assert_eq!(report.count, 1);
        assert_eq!(report.comments, 1);
        assert_eq!(f.pending.read().unwrap().comment_count(), 0);
        assert_eq!(f.remote.read().unwrap().comment("A"), Some("seen in two lessons"));
        assert_eq!(f.store.fetch_comments("S1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_comment_only_flush_skips_score_upsert() {
        let f = fixture();
        f.pending.write().unwrap().stage_comment("A", "follow up");

        let report = f.sync.flush("LT2").await.unwrap();

        assert_eq!(report.count, 0);
        assert_eq!(report.comments, 1);
        assert!(report.batch_id.is_some());
        assert_eq!(f.store.upsert_calls(), 0);
        assert!(f.sync.last_sync_time().is_some());
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_comments() {
        let f = fixture();
        f.pending.write().unwrap().stage_comment("A", "follow up");
        f.store.set_available(false);

        assert!(f.sync.flush("LT1").await.is_err());
        assert_eq!(f.pending.read().unwrap().comment_count(), 1);
        assert_eq!(f.sync.sync_state().pending_comments, 1);
        assert_eq!(f.remote.read().unwrap().comment("A"), None);
    }

    #[tokio::test]
    async fn test_empty_flush_makes_no_remote_call() {
        let f = fixture();

        let report = f.sync.flush("LT4").await.unwrap();

        assert_eq!(report.count, 0);
        assert_eq!(report.batch_id, None);
        assert_eq!(f.store.upsert_calls(), 0);
        assert_eq!(f.sync.last_sync_time(), None);
        assert_eq!(f.sync.phase("LT4"), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_flush_emits_start_and_success_events() {
        let f = fixture();
        let mut rx = f.events.subscribe();
        stage(&f, "A", 3, "yes");

        f.sync.flush("LT3").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().event_type(), "FlushStarted");
        assert_eq!(rx.recv().await.unwrap().event_type(), "FlushSucceeded");
    }

    #[tokio::test]
    async fn test_set_online_reports_changes_only() {
        let f = fixture();
        assert!(f.sync.is_online());
        assert!(f.sync.set_online(false));
        assert!(!f.sync.set_online(false));
        assert!(!f.sync.sync_state().is_online);
    }

    #[tokio::test]
    async fn test_refresh_replaces_confirmed_cache() {
        let f = fixture();
        f.store
            .seed(
                "S1",
                vec![ScoreRecord {
                    indicator_code: "A".to_string(),
                    column: ColumnKey::Checklist,
                    value: RawValue::from("yes"),
                    source_tag: "Principal".to_string(),
                }],
            )
            .await;

        f.store
            .upsert_comments(
                "S1",
                &[CommentRecord {
                    indicator_code: "A".to_string(),
                    comment: "from another device".to_string(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(f.sync.refresh().await.unwrap(), 1);
        assert_eq!(f.remote.read().unwrap().len(), 1);
        assert_eq!(f.remote.read().unwrap().comment("A"), Some("from another device"));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let f = fixture();
        stage(&f, "A", 1, "yes");
        f.pending.write().unwrap().stage_comment("A", "confirmed note");
        f.sync.flush("LT1").await.unwrap();
        stage(&f, "B", 2, "no");
        f.pending.write().unwrap().stage_comment("B", "pending note");

        f.sync.reset().await.unwrap();

        assert!(f.pending.read().unwrap().is_empty());
        assert!(f.remote.read().unwrap().is_empty());
        assert_eq!(f.remote.read().unwrap().comment_count(), 0);
        assert!(f.store.fetch_scores("S1").await.unwrap().is_empty());
        assert!(f.store.fetch_comments("S1").await.unwrap().is_empty());
        assert_eq!(f.sync.phase("LT1"), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_local_state() {
        let f = fixture();
        stage(&f, "A", 1, "yes");
        f.store.set_available(false);

        assert!(matches!(f.sync.reset().await, Err(MaintenanceError::Store(_))));
        assert_eq!(f.pending.read().unwrap().len(), 1);

        // The maintenance flag was released
        f.store.set_available(true);
        assert!(f.sync.flush("LT1").await.is_ok());
    }

    #[tokio::test]
    async fn test_sync_state_counts_pending_by_source() {
        let f = fixture();
        stage(&f, "A", 1, "yes");
        stage(&f, "B", 1, "yes");
        stage(&f, "A", 5, "no");

        let state = f.sync.sync_state();
        assert_eq!(state.pending_count_by_source.get("LT1"), Some(&2));
        assert_eq!(state.pending_count_by_source.get("LT5"), Some(&1));
        assert!(!state.is_syncing);
    }
}
