// SPDX-License-Identifier: MIT

//! End-to-end user flow over HTTP, backed by the Firestore emulator.
//!
//! Exercises the full middleware chain: credential verification, user
//! lookup, and the trip lifecycle with its counter updates.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;
use common::{create_emulator_app, mint_token};

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

fn unique_subject_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

const TRIP_BODY: &str = r#"{
    "destination": "Paris",
    "dates": {"startDate": "2026-06-01", "endDate": "2026-06-03", "days": 3},
    "interests": ["museums"],
    "itinerary": "Day 1: arrive"
}"#;

#[tokio::test]
async fn test_valid_token_unknown_user_is_not_found() {
    require_emulator!();

    let (app, _) = create_emulator_app().await;
    let token = mint_token(&unique_subject_id("ghost"));

    // Never synced: the credential is fine but there is no user record
    let response = app
        .oneshot(authed("GET", "/api/auth/me", &token, Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sync_then_me() {
    require_emulator!();

    let (app, _) = create_emulator_app().await;
    let subject = unique_subject_id("flow");
    let token = mint_token(&subject);

    let response = app
        .clone()
        .oneshot(authed("POST", "/api/auth/sync-user", &token, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isNewUser"], true);
    assert_eq!(body["user"]["subjectId"], subject.as_str());

    // Second sync finds the same record
    let response = app
        .clone()
        .oneshot(authed("POST", "/api/auth/sync-user", &token, Body::empty()))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["isNewUser"], false);

    let response = app
        .oneshot(authed("GET", "/api/auth/me", &token, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], format!("{subject}@example.com"));
}

#[tokio::test]
async fn test_deactivated_user_is_forbidden() {
    require_emulator!();

    let (app, state) = create_emulator_app().await;
    let subject = unique_subject_id("frozen");
    let token = mint_token(&subject);

    app.clone()
        .oneshot(authed("POST", "/api/auth/sync-user", &token, Body::empty()))
        .await
        .unwrap();

    // Deactivate the account out of band
    let mut user = state.db.get_user(&subject).await.unwrap().unwrap();
    user.is_active = false;
    state.db.upsert_user(&user).await.unwrap();

    // The credential is still valid, but the account gate fires
    let response = app
        .oneshot(authed("GET", "/api/auth/me", &token, Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_search_save_stats_flow() {
    require_emulator!();

    let (app, _) = create_emulator_app().await;
    let subject = unique_subject_id("trips");
    let token = mint_token(&subject);

    app.clone()
        .oneshot(authed("POST", "/api/auth/sync-user", &token, Body::empty()))
        .await
        .unwrap();

    // Log a search
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/user/search",
            &token,
            Body::from(TRIP_BODY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let search = body_json(response).await;
    let trip_id = search["trip"]["id"].as_str().unwrap().to_string();
    assert_eq!(search["trip"]["isSaved"], false);

    // Save it
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/api/user/save-trip/{trip_id}"),
            &token,
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await;
    assert_eq!(saved["trip"]["isSaved"], true);
    assert!(saved["trip"]["savedAt"].is_string());

    // Stats reflect both operations
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/user/stats", &token, Body::empty()))
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["totalSearches"], 1);
    assert_eq!(stats["savedTrips"], 1);
    assert_eq!(stats["recentSearches"].as_array().unwrap().len(), 1);

    // The full record is only on the detail route
    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/user/trip/{trip_id}"),
            &token,
            Body::empty(),
        ))
        .await
        .unwrap();
    let detail = body_json(response).await;
    assert_eq!(detail["itineraryText"], "Day 1: arrive");

    // Delete it; the saved counter goes down
    let response = app
        .clone()
        .oneshot(authed(
            "DELETE",
            &format!("/api/user/trip/{trip_id}"),
            &token,
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed("GET", "/api/user/stats", &token, Body::empty()))
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["savedTrips"], 0);
    assert_eq!(stats["totalSearches"], 1);
}

#[tokio::test]
async fn test_rating_validation_runs_before_lookup() {
    require_emulator!();

    let (app, _) = create_emulator_app().await;
    let subject = unique_subject_id("rating");
    let token = mint_token(&subject);

    app.clone()
        .oneshot(authed("POST", "/api/auth/sync-user", &token, Body::empty()))
        .await
        .unwrap();

    // Out-of-range rating for a nonexistent trip: 400, not 404
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/user/rate/no-such-trip",
            &token,
            Body::from(r#"{"rating": 9}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // In-range rating for a nonexistent trip: 404
    let response = app
        .oneshot(authed(
            "POST",
            "/api/user/rate/no-such-trip",
            &token,
            Body::from(r#"{"rating": 3}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cross_user_trip_is_not_found_over_http() {
    require_emulator!();

    let (app, _) = create_emulator_app().await;
    let owner = unique_subject_id("owner");
    let intruder = unique_subject_id("intruder");
    let owner_token = mint_token(&owner);
    let intruder_token = mint_token(&intruder);

    for token in [&owner_token, &intruder_token] {
        app.clone()
            .oneshot(authed("POST", "/api/auth/sync-user", token, Body::empty()))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/user/save-trip",
            &owner_token,
            Body::from(TRIP_BODY),
        ))
        .await
        .unwrap();
    let trip_id = body_json(response).await["trip"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // The intruder gets the same 404 as for a trip that never existed
    let response = app
        .oneshot(authed(
            "GET",
            &format!("/api/user/trip/{trip_id}"),
            &intruder_token,
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
