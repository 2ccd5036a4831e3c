use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pulselytics_core::analytics::AnalyticsBackend;

use crate::routes::required_range;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /api/activity` — DAU, MAU, and page-view conversion rates.
/// Requires explicit `start_date` and `end_date`.
pub async fn get_activity_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = required_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let result = state.db.activity_stats(range).await?;
    Ok(Json(json!({ "data": result })))
}
