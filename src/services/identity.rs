// SPDX-License-Identifier: MIT

//! Firebase ID token verification and owner-credential identity operations.
//!
//! Tokens are RS256 JWTs minted by Firebase Auth; they are verified
//! locally against Google's securetoken JWKS (cached with the TTL from
//! the response's Cache-Control header). Profile propagation and account
//! deletion go through the Identity Toolkit REST API using the caller's
//! own ID token, so no service-account credential is needed.

use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::error::AppError;

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken%40system.gserviceaccount.com";
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Verified identity extracted from a valid Firebase ID token.
///
/// Exists only for the lifetime of a request; never persisted.
#[derive(Debug, Clone)]
pub struct IdentityClaim {
    /// Firebase UID
    pub subject_id: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub picture: Option<String>,
    /// Firebase `sign_in_provider` claim ("password", "google.com", ...)
    pub sign_in_provider: Option<String>,
    /// The bearer credential itself, kept for owner-credential
    /// Identity Toolkit calls (profile update, account delete).
    pub raw_token: String,
}

/// Verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VerifyError {
    /// The token is malformed, expired, or signed by an untrusted issuer.
    #[error("invalid token: {0}")]
    Invalid(String),
    /// No Firebase project was configured at startup.
    #[error("identity verifier not configured")]
    NotConfigured,
    /// The identity service could not be reached.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Invalid(_) => AppError::InvalidToken,
            VerifyError::NotConfigured => {
                AppError::Unavailable("authentication is not configured".to_string())
            }
            VerifyError::Unavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

#[derive(Clone)]
enum VerifierMode {
    /// Verify against the live securetoken JWKS.
    Firebase { project_id: String },
    /// Verify with a fixed key (deterministic local/integration tests).
    StaticKey {
        project_id: String,
        kid: String,
        decoding_key: Arc<DecodingKey>,
        algorithm: Algorithm,
    },
    /// No project configured; every verification fails with NotConfigured.
    Disabled,
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Firebase-issued ID tokens plus owner-credential
/// Identity Toolkit operations.
pub struct IdentityVerifier {
    http_client: reqwest::Client,
    mode: VerifierMode,
    api_key: Option<String>,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl IdentityVerifier {
    /// Create a verifier from config. A missing project id produces a
    /// disabled verifier rather than a startup failure, so the rest of
    /// the API keeps serving.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        let mode = match &config.firebase_project_id {
            Some(project_id) => {
                tracing::info!(project = %project_id, "Initialized Firebase ID token verifier");
                VerifierMode::Firebase {
                    project_id: project_id.clone(),
                }
            }
            None => {
                tracing::warn!(
                    "FIREBASE_PROJECT_ID not set; authenticated routes will return 503"
                );
                VerifierMode::Disabled
            }
        };

        Ok(Self {
            http_client,
            mode,
            api_key: config.firebase_api_key.clone(),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create a verifier with a fixed decoding key.
    ///
    /// Intended for tests; the algorithm does not have to be RS256 so
    /// suites can mint HMAC tokens with a shared secret.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
        algorithm: Algorithm,
    ) -> anyhow::Result<Self> {
        let project_id = config
            .firebase_project_id
            .clone()
            .context("static-key verifier requires a project id")?;

        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static verifier kid must not be empty");
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        Ok(Self {
            http_client,
            mode: VerifierMode::StaticKey {
                project_id,
                kid,
                decoding_key: Arc::new(decoding_key),
                algorithm,
            },
            api_key: config.firebase_api_key.clone(),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify an opaque bearer credential. Single attempt, no retries.
    pub async fn verify(&self, token: &str) -> Result<IdentityClaim, VerifyError> {
        let (project_id, expected_alg) = match &self.mode {
            VerifierMode::Firebase { project_id } => (project_id.clone(), Algorithm::RS256),
            VerifierMode::StaticKey {
                project_id,
                algorithm,
                ..
            } => (project_id.clone(), *algorithm),
            VerifierMode::Disabled => return Err(VerifyError::NotConfigured),
        };

        let header = decode_header(token)
            .map_err(|e| VerifyError::Invalid(format!("invalid JWT header: {e}")))?;

        if header.alg != expected_alg {
            return Err(VerifyError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Invalid("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let issuer = format!("https://securetoken.google.com/{project_id}");
        let mut validation = Validation::new(expected_alg);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let token_data = decode::<FirebaseIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| VerifyError::Invalid(format!("JWT validation failed: {e}")))?;

        let claims = token_data.claims;

        if claims.sub.trim().is_empty() {
            return Err(VerifyError::Invalid("empty sub claim".to_string()));
        }

        let email = claims
            .email
            .ok_or_else(|| VerifyError::Invalid("missing email claim".to_string()))?;

        tracing::debug!(
            subject = %claims.sub,
            email_verified = ?claims.email_verified,
            provider = ?claims.firebase.as_ref().and_then(|f| f.sign_in_provider.as_deref()),
            "Verified Firebase ID token"
        );

        Ok(IdentityClaim {
            subject_id: claims.sub,
            email,
            email_verified: claims.email_verified.unwrap_or(false),
            display_name: claims.name,
            picture: claims.picture,
            sign_in_provider: claims.firebase.and_then(|f| f.sign_in_provider),
            raw_token: token.to_string(),
        })
    }

    /// Propagate display name / photo changes to Firebase (best effort;
    /// the caller logs failures without rolling back the local update).
    pub async fn update_profile(
        &self,
        raw_token: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), VerifyError> {
        let api_key = self.api_key.as_ref().ok_or(VerifyError::NotConfigured)?;

        let mut body = serde_json::json!({
            "idToken": raw_token,
            "returnSecureToken": false,
        });
        if let Some(name) = display_name {
            body["displayName"] = serde_json::json!(name);
        }
        if let Some(url) = photo_url {
            body["photoUrl"] = serde_json::json!(url);
        }

        let response = self
            .http_client
            .post(format!("{IDENTITY_TOOLKIT_URL}/accounts:update"))
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("accounts:update failed: {e}")))?;

        check_identity_response(response).await
    }

    /// Delete the Firebase account behind a credential. Unlike profile
    /// propagation this is a hard requirement of account deletion, so
    /// failures must surface to the caller.
    pub async fn delete_account(&self, raw_token: &str) -> Result<(), VerifyError> {
        let api_key = self.api_key.as_ref().ok_or(VerifyError::NotConfigured)?;

        let response = self
            .http_client
            .post(format!("{IDENTITY_TOOLKIT_URL}/accounts:delete"))
            .query(&[("key", api_key.as_str())])
            .json(&serde_json::json!({ "idToken": raw_token }))
            .send()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("accounts:delete failed: {e}")))?;

        check_identity_response(response).await
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, VerifyError> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
            ..
        } = &self.mode
        {
            if kid == static_kid {
                return Ok(decoding_key.clone());
            }
            return Err(VerifyError::Invalid(format!(
                "unknown JWT kid for static verifier: {kid}"
            )));
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(VerifyError::Invalid(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), VerifyError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!("Refreshing securetoken JWKS cache");

        let response = self
            .http_client
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(VerifyError::Unavailable(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
                continue;
            }

            if let Some(alg) = &jwk.alg {
                if alg != "RS256" {
                    continue;
                }
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(VerifyError::Unavailable(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        let entry = JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        };

        *self.jwks_cache.write().await = Some(entry);

        tracing::debug!(ttl_secs = ttl.as_secs(), "securetoken JWKS cache refreshed");
        Ok(())
    }
}

async fn check_identity_response(response: reqwest::Response) -> Result<(), VerifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_client_error() {
        // INVALID_ID_TOKEN, USER_NOT_FOUND, etc.
        return Err(VerifyError::Invalid(format!(
            "identity toolkit rejected request ({status}): {body}"
        )));
    }
    Err(VerifyError::Unavailable(format!(
        "identity toolkit error ({status})"
    )))
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
    firebase: Option<FirebaseClaims>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sign_in_provider: Option<String>,
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    let Some(max_age) = headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
    else {
        return fallback;
    };

    Duration::from_secs(max_age)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    for directive in value.split(',') {
        let directive = directive.trim();

        if let Some(raw) = directive.strip_prefix("max-age=") {
            let raw = raw.trim_matches('"');
            if let Ok(seconds) = raw.parse::<u64>() {
                return Some(seconds);
            }
        }
    }

    None
}
