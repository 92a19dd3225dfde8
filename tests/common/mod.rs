// SPDX-License-Identifier: MIT

use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;
use tripsmith::config::Config;
use tripsmith::db::FirestoreDb;
use tripsmith::routes::create_router;
use tripsmith::services::{GenerationClient, IdentityVerifier, ImageSearchClient, PlacesClient};
use tripsmith::AppState;

/// Shared HMAC secret for minting test credentials.
pub const TEST_SECRET: &[u8] = b"test_hmac_secret_32_bytes_min!!!";
pub const TEST_KID: &str = "test-kid";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    iss: String,
    aud: String,
    exp: usize,
    email: String,
    email_verified: bool,
    name: String,
    firebase: serde_json::Value,
}

/// Mint a credential the static-key test verifier accepts.
#[allow(dead_code)]
pub fn mint_token(subject_id: &str) -> String {
    mint_token_with_expiry(subject_id, 3600)
}

#[allow(dead_code)]
pub fn mint_token_with_expiry(subject_id: &str, exp_offset: i64) -> String {
    let claims = TestClaims {
        sub: subject_id.to_string(),
        iss: "https://securetoken.google.com/test-project".to_string(),
        aud: "test-project".to_string(),
        exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        email: format!("{subject_id}@example.com"),
        email_verified: true,
        name: "Test User".to_string(),
        firebase: serde_json::json!({ "sign_in_provider": "password" }),
    };

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
}

fn build_app(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let identity = Arc::new(
        IdentityVerifier::new_with_static_key(
            &config,
            TEST_KID,
            DecodingKey::from_secret(TEST_SECRET),
            Algorithm::HS256,
        )
        .expect("Failed to build static-key verifier"),
    );

    let state = Arc::new(AppState {
        config,
        db,
        identity,
        // No external API keys in tests: places degrade to empty,
        // generation and images report 503.
        places: PlacesClient::new(None),
        generation: GenerationClient::new(None),
        images: ImageSearchClient::new(None),
    });

    (create_router(state.clone()), state)
}

/// Create a test app with an offline mock database.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    build_app(test_db_offline())
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    build_app(test_db().await)
}
