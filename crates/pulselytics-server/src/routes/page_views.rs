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

const DEFAULT_EVENT_STATS_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /api/page-views` — top pages by pv/uv among `page_view` events.
pub async fn get_page_view_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = required_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let result = state.db.page_view_stats(range).await?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/event-stats` — top event names by count, with distinct users.
pub async fn get_event_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = required_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_STATS_LIMIT);
    let result = state.db.event_stats(range, limit).await?;
    Ok(Json(json!({ "data": result })))
}
