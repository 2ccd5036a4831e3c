use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — permissive CORS so browser clients can post events
///    cross-origin.
/// 3. `CompressionLayer` — gzip for the larger aggregation payloads.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/events",
            post(routes::collect::ingest_event).get(routes::events::list_events),
        )
        .route("/api/events/batch", post(routes::collect::ingest_batch))
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/activity", get(routes::activity::get_activity_stats))
        .route("/api/retention", get(routes::retention::get_retention_stats))
        .route("/api/page-views", get(routes::page_views::get_page_view_stats))
        .route("/api/event-stats", get(routes::page_views::get_event_stats))
        .route("/api/trends", get(routes::trends::get_trend_analysis))
        .route("/api/user-profile", get(routes::profiles::get_profile))
        .route("/api/user-profile/tags", get(routes::profiles::get_tags))
        .route(
            "/api/user-profile/behavior",
            get(routes::profiles::get_behavior_features),
        )
        .route(
            "/api/user-profile/interest",
            get(routes::profiles::get_interest_profile),
        )
        .route(
            "/api/user-profile/value",
            get(routes::profiles::get_value_assessment),
        )
        .route("/api/user-profile/list", get(routes::profiles::list_profiles))
        .route(
            "/api/user-profile/{user_id}",
            put(routes::profiles::recompute_profile),
        )
        .route(
            "/api/user-profile/update-all",
            post(routes::profiles::recompute_all_profiles),
        )
        .fallback(|| async { AppError::NotFound("route not found".to_string()) })
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .with_state(state)
}
