use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pulselytics_core::analytics::AnalyticsBackend;
use pulselytics_core::event::EventFilter;

use crate::routes::parse_date;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub event_name: Option<String>,
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /api/events` — paginated listing, newest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = EventFilter {
        event_name: query.event_name,
        event_type: query.event_type,
        user_id: query.user_id,
        start_date: parse_date(query.start_date.as_deref()),
        end_date: parse_date(query.end_date.as_deref()),
    };

    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(state.config.default_page_size);

    let result = state.db.query_events(&filter, page, page_size).await?;
    Ok(Json(json!({ "data": result })))
}
