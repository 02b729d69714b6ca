//! Aggregation reports over tours

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;

use super::error::{ApiError, ApiOperation};
use super::response::SuccessResponse;
use crate::model::tour;
use crate::state::AppState;

/// GET /tours/tour-stats
pub async fn tour_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = tour::tour_stats(state.tours()).await?;
    report("stats", &stats)
}

/// GET /tours/monthly-plan/{year}
pub async fn monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let year = parse_year(&year)?;
    let plan = tour::monthly_plan(state.tours(), year).await?;
    report("plan", &plan)
}

fn parse_year(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|year| (1..=9999).contains(year))
        .ok_or_else(|| {
            ApiError::bad_request(format!("Invalid year: {raw}")).with_operation(ApiOperation::Report)
        })
}

fn report<T: Serialize>(key: &str, rows: &T) -> Result<SuccessResponse, ApiError> {
    let value = serde_json::to_value(rows)
        .map_err(|e| ApiError::internal(e.to_string()).with_operation(ApiOperation::Report))?;
    Ok(SuccessResponse::ok(key, value))
}
