mod common;

use axum::http::StatusCode;

use common::{get, json_body, seed_event, seed_page_view, setup};

#[tokio::test]
async fn stats_reports_totals_and_name_ranking() {
    let (_state, app) = setup();
    seed_event(&app, "page_view", Some("u1"), "2026-01-10T08:00:00Z").await;
    seed_event(&app, "page_view", Some("u2"), "2026-01-10T09:00:00Z").await;
    seed_event(&app, "button_click", Some("u1"), "2026-01-10T10:00:00Z").await;

    let body = json_body(
        get(&app, "/api/stats?start_date=2026-01-10&end_date=2026-01-10").await,
    )
    .await;
    assert_eq!(body["data"]["total"], 3);
    let by_name = body["data"]["by_event_name"].as_array().expect("ranking");
    assert_eq!(by_name[0]["event_name"], "page_view");
    assert_eq!(by_name[0]["count"], 2);
}

#[tokio::test]
async fn activity_requires_explicit_date_bounds() {
    let (_state, app) = setup();
    let response = get(&app, "/api/activity").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = get(&app, "/api/activity?start_date=2026-01-10").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn activity_reports_dau_for_non_anonymous_users() {
    let (_state, app) = setup();
    seed_event(&app, "page_view", Some("u1"), "2026-01-10T08:00:00Z").await;
    seed_event(&app, "page_view", Some("u2"), "2026-01-10T09:00:00Z").await;
    seed_event(&app, "page_view", None, "2026-01-10T10:00:00Z").await;

    let body = json_body(
        get(&app, "/api/activity?start_date=2026-01-10&end_date=2026-01-10").await,
    )
    .await;
    let dau = body["data"]["dau"].as_array().expect("dau");
    assert_eq!(dau.len(), 1);
    assert_eq!(dau[0]["date"], "2026-01-10");
    assert_eq!(dau[0]["dau"], 2);
}

#[tokio::test]
async fn inverted_range_is_a_validation_error() {
    let (_state, app) = setup();
    let response = get(&app, "/api/activity?start_date=2026-01-11&end_date=2026-01-10").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn retention_defaults_to_a_seven_day_window() {
    let (_state, app) = setup();
    seed_event(&app, "login_success", Some("u1"), "2026-01-01T08:00:00Z").await;
    seed_event(&app, "login_success", Some("u1"), "2026-01-04T08:00:00Z").await;

    let body = json_body(get(&app, "/api/retention").await).await;
    assert_eq!(body["data"]["window_days"], 7);
    assert_eq!(body["data"]["day1_retention"], 0.0);
    assert_eq!(body["data"]["day7_retention"], 100.0);
    assert_eq!(body["data"]["day30_retention"], 100.0);
}

#[tokio::test]
async fn retention_tolerates_malformed_days() {
    let (_state, app) = setup();
    let body = json_body(get(&app, "/api/retention?days=soon").await).await;
    assert_eq!(body["data"]["window_days"], 7);
}

#[tokio::test]
async fn page_view_stats_reports_pv_and_uv() {
    let (_state, app) = setup();
    seed_page_view(&app, "u1", "/home", "2026-01-10T08:00:00Z").await;
    seed_page_view(&app, "u1", "/home", "2026-01-10T09:00:00Z").await;
    seed_event(&app, "login_success", Some("u1"), "2026-01-10T10:00:00Z").await;

    let body = json_body(
        get(&app, "/api/page-views?start_date=2026-01-10&end_date=2026-01-10").await,
    )
    .await;
    let rows = body["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["page_url"], "/home");
    assert_eq!(rows[0]["pv"], 2);
    assert_eq!(rows[0]["uv"], 1);
}

#[tokio::test]
async fn event_stats_honours_the_limit() {
    let (_state, app) = setup();
    seed_event(&app, "page_view", Some("u1"), "2026-01-10T08:00:00Z").await;
    seed_event(&app, "page_view", Some("u1"), "2026-01-10T08:05:00Z").await;
    seed_event(&app, "button_click", Some("u1"), "2026-01-10T08:10:00Z").await;
    seed_event(&app, "login_success", Some("u1"), "2026-01-10T08:15:00Z").await;

    let body = json_body(
        get(
            &app,
            "/api/event-stats?start_date=2026-01-10&end_date=2026-01-10&limit=2",
        )
        .await,
    )
    .await;
    let rows = body["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["event_name"], "page_view");
    assert_eq!(rows[0]["count"], 2);
}

#[tokio::test]
async fn trends_fall_back_to_the_events_metric() {
    let (_state, app) = setup();
    seed_event(&app, "page_view", Some("u1"), "2026-01-10T08:00:00Z").await;

    let body = json_body(
        get(
            &app,
            "/api/trends?metric=bogus&interval=eon&start_date=2026-01-10&end_date=2026-01-10",
        )
        .await,
    )
    .await;
    let points = body["data"].as_array().expect("points");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["count"], 1);
    assert_eq!(points[0]["unique_users"], 1);
}

#[tokio::test]
async fn dau_trend_reports_per_bucket_users() {
    let (_state, app) = setup();
    seed_event(&app, "page_view", Some("u1"), "2026-01-10T08:00:00Z").await;
    seed_event(&app, "page_view", Some("u2"), "2026-01-10T09:00:00Z").await;
    seed_event(&app, "page_view", Some("u1"), "2026-01-11T09:00:00Z").await;

    let body = json_body(
        get(
            &app,
            "/api/trends?metric=dau&interval=day&start_date=2026-01-10&end_date=2026-01-11",
        )
        .await,
    )
    .await;
    let points = body["data"].as_array().expect("points");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["dau"], 2);
    assert_eq!(points[1]["dau"], 1);
}

#[tokio::test]
async fn health_endpoint_pings_the_store() {
    let (_state, app) = setup();
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}
