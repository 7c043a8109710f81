//! srt-rollup library - assessment roll-up engine
//!
//! Turns raw per-indicator ratings (ten rater columns plus a checklist) into
//! indicator verdicts, outcome tiers, substrand distributions and weighted
//! dimension grades. Local edits are staged per source and flushed to the
//! score store as one batch, together with any staged indicator comments.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod aggregate;
pub mod api;
pub mod assessment;
pub mod collect;
pub mod comment;
pub mod hierarchy;
mod locks;
pub mod model;
pub mod normalize;
pub mod pending;
pub mod remote;
pub mod resolve;
pub mod store;
pub mod sync;

pub use aggregate::{Grade, OutcomeTier, ScoringPath};
pub use assessment::Assessment;
pub use hierarchy::Hierarchy;
pub use comment::CommentRecord;
pub use model::{ColumnKey, DataPoint, ScoreKey, ScoreRecord};
pub use normalize::{normalize, NormalizedValue, RawValue};
pub use resolve::{resolve_indicator, IndicatorVerdict};
pub use store::{MemoryScoreStore, ScoreStore, SqliteScoreStore, StoreError};
pub use sync::{SyncCoordinator, SyncPhase, SyncState};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub assessment: Arc<Assessment>,
}

impl AppState {
    pub fn new(assessment: Arc<Assessment>) -> Self {
        Self { assessment }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let scores = Router::new()
        .route("/api/indicators/:code", get(api::get_indicator))
        .route("/api/outcomes/:id", get(api::get_outcome))
        .route(
            "/api/substrands/:id/distribution",
            get(api::get_substrand_distribution),
        )
        .route("/api/dimensions/:id", get(api::get_dimension))
        .route("/api/dimensions/:id/simple", get(api::get_simple_dimension))
        .route("/api/overall", get(api::get_overall))
        .route("/api/stats", get(api::get_indicator_stats));

    let edits = Router::new()
        .route("/api/edits", post(api::stage_edit))
        .route(
            "/api/pending/:source",
            get(api::get_pending).delete(api::discard_pending),
        )
        .route(
            "/api/comments/:code",
            get(api::get_comment).put(api::put_comment),
        );

    let sync = Router::new()
        .route("/api/sync", get(api::get_sync_state))
        .route("/api/sync/:source/flush", post(api::flush_source))
        .route("/api/connectivity", post(api::set_connectivity))
        .route("/api/refresh", post(api::refresh_scores))
        .route("/api/reset", post(api::reset_scores))
        .route("/events", get(api::event_stream));

    Router::new()
        .merge(scores)
        .merge(edits)
        .merge(sync)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
