//! Indicator comments

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::assessment::IndicatorComment;
use crate::pending::PendingComment;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    /// Blank text removes the comment on the next flush
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: PendingComment,
    pub pending_comments: usize,
}

/// GET /api/comments/:code
pub async fn get_comment(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<IndicatorComment> {
    Json(state.assessment.comment(&code))
}

/// PUT /api/comments/:code
pub async fn put_comment(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("indicator code must not be empty".to_string()));
    }

    let comment = state.assessment.stage_comment(code, &request.comment);
    let pending_comments = state.assessment.pending_comments().len();

    Ok(Json(CommentResponse {
        comment,
        pending_comments,
    }))
}
