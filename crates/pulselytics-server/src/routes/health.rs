use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// `GET /health` — liveness probe backed by a `SELECT 1` against DuckDB.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .ping()
        .await
        .map_err(|err| AppError::Unavailable(err.to_string()))?;
    Ok(Json(json!({ "status": "ok" })))
}
