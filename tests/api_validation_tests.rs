// SPDX-License-Identifier: MIT

//! Input validation tests for the public routes.
//!
//! Validation runs before any external call or database access, so
//! these all work against the offline mock app.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;
use common::create_test_app;

async fn post_json(app: axum::Router, uri: &str, body: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_generate_itinerary_requires_destination() {
    let (app, _) = create_test_app();

    let response = post_json(
        app,
        "/api/generate-itinerary",
        r#"{"destination": "  ", "days": 3, "startDate": "2026-06-01", "endDate": "2026-06-03"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_itinerary_rejects_day_count_mismatch() {
    let (app, _) = create_test_app();

    let response = post_json(
        app,
        "/api/generate-itinerary",
        r#"{"destination": "Paris", "days": 7, "startDate": "2026-06-01", "endDate": "2026-06-03"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_itinerary_rejects_reversed_dates() {
    let (app, _) = create_test_app();

    let response = post_json(
        app,
        "/api/generate-itinerary",
        r#"{"destination": "Paris", "days": 3, "startDate": "2026-06-03", "endDate": "2026-06-01"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_itinerary_rejects_unparseable_date() {
    let (app, _) = create_test_app();

    let response = post_json(
        app,
        "/api/generate-itinerary",
        r#"{"destination": "Paris", "days": 1, "startDate": "June 1st", "endDate": "2026-06-01"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_itinerary_rejects_negative_budget() {
    let (app, _) = create_test_app();

    let response = post_json(
        app,
        "/api/generate-itinerary",
        r#"{"destination": "Paris", "days": 1, "startDate": "2026-06-01", "endDate": "2026-06-01", "budget": -50}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_itinerary_unconfigured_is_service_unavailable() {
    let (app, _) = create_test_app();

    // Valid payload, but the test app has no generation API key
    let response = post_json(
        app,
        "/api/generate-itinerary",
        r#"{"destination": "Paris", "days": 3, "startDate": "2026-06-01", "endDate": "2026-06-03"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_gallery_requires_query() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/gallery/search-images")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gallery_rejects_blank_query() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/gallery/search-images?query=%20%20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gallery_unconfigured_is_service_unavailable() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/gallery/search-images?query=Paris")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_sync_user_with_malformed_json_body() {
    let (app, _) = create_test_app();

    let response = post_json(app, "/api/auth/sync-user", r#"{"idToken": "#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
