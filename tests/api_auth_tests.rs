// SPDX-License-Identifier: MIT

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Token verification distinguishes bad tokens from outages
//! 3. CORS preflight requests return correct headers
//!
//! Everything here runs against the offline mock database; requests
//! must be rejected before any database access happens.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;
use common::{create_test_app, mint_token, mint_token_with_expiry};

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_protected_route_with_malformed_header() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/search-history")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let (app, _) = create_test_app();
    let token = mint_token_with_expiry("user-expired", -3600);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_token_reports_invalid_as_valid_false() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/verify-token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"idToken": "garbage"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    // Bad token is not an error: the client should re-authenticate
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert!(body.get("subjectId").is_none());
}

#[tokio::test]
async fn test_verify_token_accepts_valid_token() {
    let (app, _) = create_test_app();
    let token = mint_token("user-verify");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/verify-token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(r#"{{"idToken": "{token}"}}"#)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["subjectId"], "user-verify");
    assert_eq!(body["email"], "user-verify@example.com");
}

#[tokio::test]
async fn test_sync_user_without_any_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/sync-user")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/auth/sync-user")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/auth/sync-user")
                .header(header::ORIGIN, "https://evil.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_security_headers_present() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
}

// ─── Gate middleware behavior ────────────────────────────────

/// Build the context `require_auth` would attach, for exercising the
/// gates in isolation.
fn gate_context(email_verified: bool, is_premium: bool) -> tripsmith::middleware::auth::AuthContext {
    use tripsmith::models::User;
    use tripsmith::services::IdentityClaim;

    let claim = IdentityClaim {
        subject_id: "gate-user".to_string(),
        email: "gate-user@example.com".to_string(),
        email_verified,
        display_name: None,
        picture: None,
        sign_in_provider: Some("password".to_string()),
        raw_token: "unused".to_string(),
    };
    let mut user = User::from_claim(&claim);
    user.is_premium = is_premium;
    tripsmith::middleware::auth::AuthContext { claim, user }
}

/// Router with `gate` applied and the given context attached upstream,
/// as it would be after `require_auth`.
fn gated_app<F, Fut>(
    gate: F,
    ctx: tripsmith::middleware::auth::AuthContext,
) -> axum::Router
where
    F: Fn(Request<Body>, axum::middleware::Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<axum::response::Response, tripsmith::error::AppError>>
        + Send
        + 'static,
{
    use axum::{routing::get, Router};

    Router::new()
        .route("/gated", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn(gate))
        .layer(axum::middleware::from_fn(
            move |mut req: Request<Body>, next: axum::middleware::Next| {
                let ctx = ctx.clone();
                async move {
                    req.extensions_mut().insert(ctx);
                    next.run(req).await
                }
            },
        ))
}

#[tokio::test]
async fn test_premium_gate_rejects_non_premium_user() {
    let app = gated_app(
        tripsmith::middleware::auth::require_premium,
        gate_context(true, false),
    );

    let response = app
        .oneshot(Request::builder().uri("/gated").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_premium_gate_passes_premium_user() {
    let app = gated_app(
        tripsmith::middleware::auth::require_premium,
        gate_context(true, true),
    );

    let response = app
        .oneshot(Request::builder().uri("/gated").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verified_email_gate_rejects_unverified_claim() {
    let app = gated_app(
        tripsmith::middleware::auth::require_verified_email,
        gate_context(false, false),
    );

    let response = app
        .oneshot(Request::builder().uri("/gated").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_verified_email_gate_passes_verified_claim() {
    let app = gated_app(
        tripsmith::middleware::auth::require_verified_email,
        gate_context(true, false),
    );

    let response = app
        .oneshot(Request::builder().uri("/gated").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_premium_gate_without_context_is_unauthorized() {
    use axum::{routing::get, Router};

    let app = Router::new()
        .route("/premium", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn(
            tripsmith::middleware::auth::require_premium,
        ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/premium")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verified_email_gate_without_context_is_unauthorized() {
    use axum::{routing::get, Router};

    let app = Router::new()
        .route("/verified", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn(
            tripsmith::middleware::auth::require_verified_email,
        ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/verified")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
