// SPDX-License-Identifier: MIT

//! Authentication routes: session sync, profile, account lifecycle.

use crate::error::{AppError, Result};
use crate::middleware::auth::{extract_bearer_token, AuthContext};
use crate::models::{AuthProvider, ProfilePatch, User};
use crate::services::identity::VerifyError;
use crate::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Routes that do their own credential handling.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/sync-user", post(sync_user))
        .route("/api/auth/verify-token", post(verify_token))
}

/// Routes behind `require_auth` (applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/me", get(get_me))
        .route("/api/auth/profile", put(update_profile))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/account", delete(delete_account))
}

// ─── User Profile ────────────────────────────────────────────

/// User profile as returned by the API.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub auth_provider: AuthProvider,
    pub preferences: PreferencesResponse,
    pub is_premium: bool,
    pub stats: StatsResponse,
    pub last_login: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PreferencesResponse {
    pub dark_mode: bool,
    pub default_interests: Vec<String>,
    pub currency: String,
    pub language: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatsResponse {
    pub total_searches: u32,
    pub total_itineraries: u32,
    pub saved_trips: u32,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            subject_id: user.subject_id,
            email: user.email,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            email_verified: user.email_verified,
            auth_provider: user.auth_provider,
            preferences: PreferencesResponse {
                dark_mode: user.preferences.dark_mode,
                default_interests: user.preferences.default_interests,
                currency: user.preferences.currency,
                language: user.preferences.language,
            },
            is_premium: user.is_premium,
            stats: StatsResponse {
                total_searches: user.stats.total_searches,
                total_itineraries: user.stats.total_itineraries,
                saved_trips: user.stats.saved_trips,
            },
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

// ─── Session Sync ────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SyncUserRequest {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncUserResponse {
    pub success: bool,
    pub is_new_user: bool,
    pub user: UserResponse,
}

/// Find-or-create the user record behind a Firebase credential.
///
/// The token is accepted from the Authorization header or an `idToken`
/// body field; the header wins when both are present. The body is
/// optional, so it is read raw rather than through the Json extractor.
async fn sync_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<SyncUserResponse>> {
    let body_token = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<SyncUserRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))?
            .id_token
    };

    let token = extract_bearer_token(&headers)
        .or(body_token)
        .ok_or_else(|| AppError::BadRequest("ID token is required".to_string()))?;

    let claim = state.identity.verify(&token).await?;
    let (user, is_new_user) = state.db.sync_user_from_claim(&claim).await?;

    tracing::info!(
        subject = %user.subject_id,
        is_new_user,
        "User session synced"
    );

    Ok(Json(SyncUserResponse {
        success: true,
        is_new_user,
        user: user.into(),
    }))
}

// ─── Token Verification ──────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyTokenRequest {
    id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Check a credential without any side effects.
///
/// A bad token is a 200 `{valid: false}`; only verifier outages are
/// errors (503), so the client can tell "log in again" apart from
/// "try later".
async fn verify_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyTokenRequest>,
) -> Result<Json<VerifyTokenResponse>> {
    match state.identity.verify(&req.id_token).await {
        Ok(claim) => Ok(Json(VerifyTokenResponse {
            valid: true,
            subject_id: Some(claim.subject_id),
            email: Some(claim.email),
        })),
        Err(VerifyError::Invalid(reason)) => {
            tracing::debug!(reason = %reason, "Token verification failed");
            Ok(Json(VerifyTokenResponse {
                valid: false,
                subject_id: None,
                email: None,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

// ─── Profile ─────────────────────────────────────────────────

/// Get current user profile.
async fn get_me(Extension(ctx): Extension<AuthContext>) -> Result<Json<UserResponse>> {
    Ok(Json(ctx.user.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    display_name: Option<String>,
    avatar_url: Option<String>,
    preferences: Option<PreferencesPatch>,
}

/// Partial preferences update; absent fields stay as stored.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PreferencesPatch {
    dark_mode: Option<bool>,
    default_interests: Option<Vec<String>>,
    currency: Option<String>,
    language: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub user: UserResponse,
}

/// Patch the profile. Only the fields present in the request change;
/// the stored document is re-read transactionally so the patch cannot
/// clobber counters updated since this request authenticated.
///
/// Name/avatar changes are also pushed to Firebase so other clients of
/// the same project see them; that propagation is best effort.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>> {
    let display_name = match &req.display_name {
        Some(name) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::BadRequest(
                    "displayName must not be empty".to_string(),
                ));
            }
            Some(name.to_string())
        }
        None => None,
    };

    let prefs = req.preferences.unwrap_or_default();
    let patch = ProfilePatch {
        display_name,
        avatar_url: req.avatar_url.clone(),
        dark_mode: prefs.dark_mode,
        default_interests: prefs.default_interests,
        currency: prefs.currency,
        language: prefs.language,
    };

    let user = state
        .db
        .update_user_profile(&ctx.user.subject_id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if req.display_name.is_some() || req.avatar_url.is_some() {
        if let Err(e) = state
            .identity
            .update_profile(
                &ctx.claim.raw_token,
                req.display_name.as_deref().map(str::trim),
                req.avatar_url.as_deref(),
            )
            .await
        {
            tracing::warn!(
                subject = %user.subject_id,
                error = %e,
                "Profile saved but Firebase propagation failed"
            );
        }
    }

    Ok(Json(UpdateProfileResponse {
        success: true,
        user: user.into(),
    }))
}

// ─── Logout ──────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Log the logout. Sessions are client-held Firebase tokens, so there
/// is no server state to tear down.
async fn logout(Extension(ctx): Extension<AuthContext>) -> Json<LogoutResponse> {
    tracing::info!(subject = %ctx.user.subject_id, "User logged out");
    Json(LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

// ─── Account Deletion ────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
    pub deleted_trips: usize,
}

/// Delete the account and all stored data.
///
/// The Firebase account goes first: if that fails nothing local is
/// touched and the user can retry. A failure after the Firebase delete
/// is a partial deletion and is surfaced as an error.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<DeleteAccountResponse>> {
    tracing::info!(
        subject = %ctx.user.subject_id,
        "User-initiated account deletion"
    );

    state
        .identity
        .delete_account(&ctx.claim.raw_token)
        .await
        .map_err(AppError::from)?;

    let deleted_trips = state
        .db
        .delete_user_data(&ctx.user.subject_id)
        .await
        .inspect_err(|e| {
            tracing::error!(
                subject = %ctx.user.subject_id,
                error = %e,
                "Firebase account deleted but local data cleanup failed"
            );
        })?;

    Ok(Json(DeleteAccountResponse {
        success: true,
        message: "Account and all associated data deleted".to_string(),
        deleted_trips,
    }))
}
