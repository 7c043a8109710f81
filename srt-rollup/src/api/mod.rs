//! HTTP API handlers for srt-rollup

pub mod comments;
pub mod edits;
pub mod events;
pub mod health;
pub mod scores;
pub mod sync;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::StoreError;
use crate::sync::{FlushError, MaintenanceError};

pub use comments::{get_comment, put_comment};
pub use edits::{discard_pending, get_pending, stage_edit};
pub use events::event_stream;
pub use health::health_routes;
pub use scores::{
    get_dimension, get_indicator, get_indicator_stats, get_outcome, get_overall,
    get_simple_dimension, get_substrand_distribution,
};
pub use sync::{flush_source, get_sync_state, refresh_scores, reset_scores, set_connectivity};

/// Error returned by every handler
///
/// Serialized as `{"error": "<message>"}`; flush failures also carry
/// `"success": false`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Flush(FlushError),
    Maintenance(MaintenanceError),
    Internal(String),
}

impl From<FlushError> for ApiError {
    fn from(e: FlushError) -> Self {
        ApiError::Flush(e)
    }
}

impl From<MaintenanceError> for ApiError {
    fn from(e: MaintenanceError) -> Self {
        ApiError::Maintenance(e)
    }
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, flush) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, false),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, false),
            ApiError::Flush(e) => {
                let status = match &e {
                    FlushError::AlreadyFlushing(_) | FlushError::Busy(_) => StatusCode::CONFLICT,
                    FlushError::Offline { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    FlushError::Store { .. } => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string(), true)
            }
            ApiError::Maintenance(e) => {
                let status = match &e {
                    MaintenanceError::FlushInFlight(_) | MaintenanceError::Busy(_) => {
                        StatusCode::CONFLICT
                    }
                    MaintenanceError::Store(inner) => store_status(inner),
                };
                (status, e.to_string(), false)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, false),
        };

        let body = if flush {
            json!({ "success": false, "error": message })
        } else {
            json!({ "error": message })
        };

        (status, Json(body)).into_response()
    }
}
