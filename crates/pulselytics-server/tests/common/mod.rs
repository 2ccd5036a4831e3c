#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use pulselytics_core::config::Config;
use pulselytics_duckdb::DuckDbBackend;
use pulselytics_server::app::build_app;
use pulselytics_server::state::AppState;

pub fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/pulselytics-test".to_string(),
        duckdb_memory_limit: "1GB".to_string(),
        profile_refresh_secs: 3600,
        default_page_size: 50,
    }
}

pub fn setup() -> (Arc<AppState>, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    let app = build_app(Arc::clone(&state));
    (state, app)
}

pub async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

pub async fn post_json(app: &axum::Router, uri: &str, body: Value) -> axum::http::Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", "10.0.0.1")
        .header("user-agent", "Mozilla/5.0 Chrome/120")
        .body(Body::from(body.to_string()))
        .expect("build request");
    app.clone().oneshot(request).await.expect("request")
}

pub async fn get(app: &axum::Router, uri: &str) -> axum::http::Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    app.clone().oneshot(request).await.expect("request")
}

/// Seed one event through the ingestion endpoint with a replay timestamp so
/// tests control the time axis.
pub async fn seed_event(app: &axum::Router, name: &str, user_id: Option<&str>, timestamp: &str) {
    seed_event_with(app, name, user_id, timestamp, None).await;
}

pub async fn seed_page_view(app: &axum::Router, user_id: &str, page: &str, timestamp: &str) {
    seed_event_with(
        app,
        "page_view",
        Some(user_id),
        timestamp,
        Some(json!({ "page_name": page })),
    )
    .await;
}

pub async fn seed_event_with(
    app: &axum::Router,
    name: &str,
    user_id: Option<&str>,
    timestamp: &str,
    properties: Option<Value>,
) {
    let mut body = json!({ "event": name, "timestamp": timestamp });
    if let Some(user_id) = user_id {
        body["user_id"] = json!(user_id);
    }
    if let Some(properties) = properties {
        body["properties"] = properties;
    }
    let response = post_json(app, "/api/events", body).await;
    assert_eq!(response.status(), StatusCode::OK);
}
