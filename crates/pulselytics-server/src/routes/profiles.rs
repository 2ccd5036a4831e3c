use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pulselytics_core::analytics::ProfileStore;
use pulselytics_core::profile::ProfileFilter;

use crate::{error::AppError, state::AppState};

const DEFAULT_LIST_PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

fn require_user_id(query: UserQuery) -> Result<String, AppError> {
    match query.user_id {
        Some(user_id) if !user_id.is_empty() => Ok(user_id),
        _ => Err(AppError::Validation("user_id is required".to_string())),
    }
}

/// `GET /api/user-profile` — the full profile assembled live from the event
/// store. Unknown users are a 200 with `data: null`, not an error.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user_id(query)?;
    let profile = state.profiler.profile(&user_id).await?;
    Ok(Json(json!({ "data": profile })))
}

/// `GET /api/user-profile/tags`
pub async fn get_tags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user_id(query)?;
    let tags = state.profiler.tags(&user_id).await?;
    Ok(Json(json!({ "data": tags })))
}

/// `GET /api/user-profile/behavior`
pub async fn get_behavior_features(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user_id(query)?;
    let features = state.profiler.behavior_features(&user_id).await?;
    Ok(Json(json!({ "data": features })))
}

/// `GET /api/user-profile/interest`
pub async fn get_interest_profile(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user_id(query)?;
    let interests = state.profiler.interest_profile(&user_id).await?;
    Ok(Json(json!({ "data": interests })))
}

/// `GET /api/user-profile/value`
pub async fn get_value_assessment(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user_id(query)?;
    let assessment = state.profiler.value_assessment(&user_id).await?;
    Ok(Json(json!({ "data": assessment })))
}

#[derive(Debug, Deserialize)]
pub struct ProfileListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub activity_level: Option<String>,
    pub value_level: Option<String>,
}

/// `GET /api/user-profile/list` — stored profiles, most recently active
/// first, filterable by level.
pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfileListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ProfileFilter {
        activity_level: query.activity_level.filter(|s| !s.is_empty()),
        value_level: query.value_level.filter(|s| !s.is_empty()),
    };
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_LIST_PAGE_SIZE);

    let result = state.db.list_profiles(&filter, page, page_size).await?;
    Ok(Json(json!({ "data": result })))
}

/// `PUT /api/user-profile/{user_id}` — recompute and upsert one profile.
/// Unknown users yield `data: null` and no write.
pub async fn recompute_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if user_id.is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    let profile = state.profiler.recompute(&user_id).await?;
    Ok(Json(json!({ "data": profile })))
}

/// `POST /api/user-profile/update-all` — synchronous recompute of every
/// known user; returns the `{total, success, failed}` summary.
pub async fn recompute_all_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.profiler.recompute_all().await?;
    Ok(Json(json!({ "data": summary })))
}
