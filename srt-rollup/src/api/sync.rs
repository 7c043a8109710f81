//! Sync endpoints: flush, status, connectivity, refresh, reset

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::ApiError;
use crate::sync::{FlushReport, SyncState};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: FlushReport,
}

/// POST /api/sync/:source/flush
///
/// The flush runs on its own task so a dropped client connection cannot
/// cut it short.
pub async fn flush_source(
    State(state): State<AppState>,
    Path(source_tag): Path<String>,
) -> Result<Json<FlushResponse>, ApiError> {
    let assessment = state.assessment.clone();
    let task = tokio::spawn(async move { assessment.flush(&source_tag).await });

    let report = task.await.map_err(|e| {
        error!("Flush task failed: {}", e);
        ApiError::Internal(format!("flush task failed: {}", e))
    })??;

    Ok(Json(FlushResponse {
        success: true,
        report,
    }))
}

/// GET /api/sync
pub async fn get_sync_state(State(state): State<AppState>) -> Json<SyncState> {
    Json(state.assessment.sync_state())
}

#[derive(Debug, Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectivityResponse {
    pub online: bool,
    pub changed: bool,
}

/// POST /api/connectivity
pub async fn set_connectivity(
    State(state): State<AppState>,
    Json(request): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    let changed = state.assessment.set_online(request.online);
    Json(ConnectivityResponse {
        online: request.online,
        changed,
    })
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub records: usize,
}

/// POST /api/refresh
pub async fn refresh_scores(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let records = state.assessment.refresh().await?;
    Ok(Json(RefreshResponse { records }))
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub deleted: u64,
}

/// POST /api/reset
///
/// Deletes every confirmed score for the school and all pending edits.
pub async fn reset_scores(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let deleted = state.assessment.reset().await?;
    Ok(Json(ResetResponse { deleted }))
}
