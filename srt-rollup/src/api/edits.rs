//! Staging and discarding local edits

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::model::{ColumnKey, DEFAULT_CHECKLIST_LABEL};
use crate::normalize::RawValue;
use crate::pending::PendingEdit;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StageRequest {
    pub indicator_code: String,
    /// "LT1".."LT10" or "CHECKLIST", case-insensitive
    pub column_key: String,
    /// Any JSON scalar; unrecognized values are kept and read as unset
    #[serde(default = "null_value")]
    pub value: RawValue,
    /// Defaults to the column name for rater columns and "Checklist" for
    /// the checklist column
    pub source_tag: Option<String>,
}

fn null_value() -> RawValue {
    RawValue::Null
}

#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub edit: PendingEdit,
    pub pending_for_source: usize,
}

/// POST /api/edits
pub async fn stage_edit(
    State(state): State<AppState>,
    Json(request): Json<StageRequest>,
) -> Result<Json<StageResponse>, ApiError> {
    let code = request.indicator_code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("indicator_code must not be empty".to_string()));
    }

    let column: ColumnKey = request
        .column_key
        .parse()
        .map_err(|e: crate::model::InvalidColumnKey| ApiError::BadRequest(e.to_string()))?;

    let source_tag = match request.source_tag.as_deref().map(str::trim) {
        Some(tag) if !tag.is_empty() => tag.to_string(),
        _ => match column {
            ColumnKey::Rater(_) => column.to_string(),
            ColumnKey::Checklist => DEFAULT_CHECKLIST_LABEL.to_string(),
        },
    };

    let edit = state
        .assessment
        .stage(code, column, request.value, &source_tag);
    let pending_for_source = state.assessment.pending_count(&source_tag);

    Ok(Json(StageResponse {
        edit,
        pending_for_source,
    }))
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub source_tag: String,
    pub count: usize,
    pub is_syncing: bool,
    pub entries: Vec<PendingEdit>,
}

/// GET /api/pending/:source
pub async fn get_pending(
    State(state): State<AppState>,
    Path(source_tag): Path<String>,
) -> Json<PendingResponse> {
    let entries = state.assessment.pending_entries(&source_tag);
    Json(PendingResponse {
        count: entries.len(),
        is_syncing: state.assessment.is_syncing(&source_tag),
        source_tag,
        entries,
    })
}

#[derive(Debug, Serialize)]
pub struct DiscardResponse {
    pub source_tag: String,
    pub discarded: usize,
}

/// DELETE /api/pending/:source
pub async fn discard_pending(
    State(state): State<AppState>,
    Path(source_tag): Path<String>,
) -> Json<DiscardResponse> {
    let discarded = state.assessment.discard_all(&source_tag);
    Json(DiscardResponse {
        source_tag,
        discarded,
    })
}
