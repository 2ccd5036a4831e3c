use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pulselytics_core::analytics::{AnalyticsBackend, TrendInterval, TrendMetric};

use crate::routes::required_range;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub metric: Option<String>,
    pub interval: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /api/trends` — bucketed trend series. Unknown `metric` falls back
/// to `events`, unknown `interval` to `day`.
pub async fn get_trend_analysis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = required_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let metric = TrendMetric::parse(query.metric.as_deref());
    let interval = TrendInterval::parse(query.interval.as_deref());

    let result = state.db.trend_analysis(metric, range, interval).await?;
    Ok(Json(json!({ "data": result })))
}
