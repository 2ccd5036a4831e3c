use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pulselytics_core::analytics::AnalyticsBackend;

use crate::routes::parse_date;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub event_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /api/stats` — overview counts, per-name ranking, trailing-24h series.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .stats(
            query.event_type.as_deref(),
            parse_date(query.start_date.as_deref()),
            parse_date(query.end_date.as_deref()),
        )
        .await?;
    Ok(Json(json!({ "data": result })))
}
