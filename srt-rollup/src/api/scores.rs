//! Read-only score views
//!
//! Every response is recomputed from current pending and confirmed values.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::aggregate::{IndicatorStats, ScoringPath, TierDistribution};
use crate::assessment::{DimensionReport, OutcomeView, OverallReport, SimpleDimensionReport};
use crate::model::DataPoint;
use crate::resolve::{resolve_indicator, IndicatorResolution};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    /// "tiered" (default) or "simple"
    #[serde(default)]
    pub path: ScoringPath,
}

#[derive(Debug, Serialize)]
pub struct IndicatorResponse {
    pub indicator_code: String,
    /// Whether the code is part of the loaded hierarchy
    pub known: bool,
    #[serde(flatten)]
    pub resolution: IndicatorResolution,
    pub data_points: Vec<DataPoint>,
}

/// GET /api/indicators/:code
pub async fn get_indicator(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<IndicatorResponse> {
    let assessment = &state.assessment;
    let data_points = assessment.data_points(&code);
    let resolution = resolve_indicator(&data_points);

    Json(IndicatorResponse {
        known: assessment.hierarchy().indicator(&code).is_some(),
        indicator_code: code,
        resolution,
        data_points,
    })
}

/// GET /api/outcomes/:id?path=tiered|simple
pub async fn get_outcome(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Json<OutcomeView>, ApiError> {
    state
        .assessment
        .outcome_view(&id, query.path)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown outcome: {}", id)))
}

/// GET /api/substrands/:id/distribution
pub async fn get_substrand_distribution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TierDistribution>, ApiError> {
    state
        .assessment
        .substrand_distribution(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown substrand: {}", id)))
}

/// GET /api/dimensions/:id
///
/// Tiered score plus completion, value counts and strengths/needs.
pub async fn get_dimension(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DimensionReport>, ApiError> {
    state
        .assessment
        .dimension_report(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown dimension: {}", id)))
}

/// GET /api/dimensions/:id/simple
pub async fn get_simple_dimension(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SimpleDimensionReport>, ApiError> {
    state
        .assessment
        .simple_dimension(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown dimension: {}", id)))
}

/// GET /api/overall?path=tiered|simple
pub async fn get_overall(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Json<OverallReport> {
    Json(state.assessment.overall(query.path))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Comma-separated indicator codes
    #[serde(default)]
    pub codes: String,
}

/// GET /api/stats?codes=A,B,C
///
/// Value counts over an arbitrary set of indicators, one value each.
pub async fn get_indicator_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<IndicatorStats>, ApiError> {
    let codes: Vec<&str> = query
        .codes
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if codes.is_empty() {
        return Err(ApiError::BadRequest("codes must name at least one indicator".to_string()));
    }
    Ok(Json(state.assessment.indicator_stats(&codes)))
}
