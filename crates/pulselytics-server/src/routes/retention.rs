use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pulselytics_core::analytics::AnalyticsBackend;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RetentionQuery {
    pub days: Option<String>,
}

/// `GET /api/retention` — first-login cohort retention for the 1/7/30-day
/// windows. `days` defaults to 7 and tolerates malformed input.
pub async fn get_retention_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RetentionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let days = query
        .days
        .as_deref()
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(7);
    let result = state.db.retention_stats(days).await?;
    Ok(Json(json!({ "data": result })))
}
