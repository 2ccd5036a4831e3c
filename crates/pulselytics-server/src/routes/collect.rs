use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use pulselytics_core::analytics::AnalyticsBackend;
use pulselytics_core::event::{EventInput, NewEvent};

use crate::{error::AppError, state::AppState};

/// `POST /api/events` — ingest a single behavioral event.
///
/// 422 when the `event` name is missing or empty. The stored row captures
/// the client IP (`x-forwarded-for`, first entry), the `user-agent` header,
/// and a correlation id (`x-request-id` or a fresh UUID). `created_at` is
/// assigned here unless the payload carries a replay `timestamp`.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<EventInput>,
) -> Result<impl IntoResponse, AppError> {
    let request_id = extract_request_id(&headers);
    let event = enrich(payload, &headers, &request_id)?;
    let event_id = state.db.append(&event).await?;

    tracing::info!(
        event_name = %event.event_name,
        request_id = %event.request_id,
        "Event recorded"
    );
    Ok(Json(json!({ "data": { "event_id": event_id } })))
}

#[derive(Debug, Deserialize)]
pub struct BatchPayload {
    pub events: Option<Vec<EventInput>>,
}

/// `POST /api/events/batch` — ingest a batch atomically.
///
/// 422 when the array is missing/empty or any element lacks an event name;
/// validation runs before any write, so a rejected batch stores nothing.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn ingest_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<BatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    let inputs = match payload.events {
        Some(events) if !events.is_empty() => events,
        _ => {
            return Err(AppError::Validation(
                "events array is required".to_string(),
            ))
        }
    };

    let request_id = extract_request_id(&headers);
    let mut batch = Vec::with_capacity(inputs.len());
    for input in inputs {
        batch.push(enrich(input, &headers, &request_id)?);
    }

    let ids = state.db.append_batch(&batch).await?;
    tracing::info!(count = ids.len(), "Event batch recorded");
    Ok(Json(json!({ "data": { "count": ids.len() } })))
}

fn enrich(input: EventInput, headers: &HeaderMap, request_id: &str) -> Result<NewEvent, AppError> {
    NewEvent::from_input(
        input,
        extract_client_ip(headers),
        extract_user_agent(headers),
        request_id.to_string(),
        Utc::now(),
    )
    .map_err(AppError::from)
}

/// Extract the real client IP from `X-Forwarded-For` (first entry).
fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Correlation id: the caller's `x-request-id` when present, else a fresh
/// UUID v4 shared by every event in the request.
fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
