// SPDX-License-Identifier: MIT

//! Authentication middleware: Firebase ID token verification plus the
//! request-gating policies built on top of it.
//!
//! Ordering matters: `require_premium` and `require_verified_email` read
//! the context that `require_auth` attaches, and fail 401 (not panic or
//! 403) when it is absent.

use crate::error::AppError;
use crate::models::User;
use crate::services::identity::IdentityClaim;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Verified identity attached to the request by `require_auth` (or by
/// `optional_auth` when a valid credential is present).
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claim: IdentityClaim,
    pub user: User,
}

/// Extractor for handlers that work with or without identity (paired
/// with `optional_auth`). Always succeeds.
pub struct MaybeAuth(pub Option<AuthContext>);

impl<S> axum::extract::FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(parts.extensions.get::<AuthContext>().cloned()))
    }
}

/// Extract the opaque bearer credential from an Authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Run the full authentication chain: verify the credential, look up the
/// directory record, check the deactivation gate.
///
/// The stages are strictly sequential; an invalid credential never
/// reaches the user lookup.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, AppError> {
    let token = extract_bearer_token(headers).ok_or(AppError::Unauthorized)?;

    let claim = state.identity.verify(&token).await?;

    let user = state
        .db
        .get_user(&claim.subject_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("User not found in database. Please sign up again.".to_string())
        })?;

    if !user.is_active {
        return Err(AppError::Forbidden(
            "Your account has been deactivated. Please contact support.".to_string(),
        ));
    }

    Ok(AuthContext { claim, user })
}

/// Middleware that requires a valid credential and a provisioned,
/// active user. Failures short-circuit before the handler runs.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Middleware that attaches identity when a valid credential is present
/// but never fails the request, whatever goes wrong.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()).await {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
        }
        Err(e) => {
            tracing::debug!(error = %e, "Optional auth did not attach identity");
        }
    }
    next.run(request).await
}

/// Premium feature gate. Runs after `require_auth`.
pub async fn require_premium(request: Request, next: Next) -> Result<Response, AppError> {
    let ctx = request
        .extensions()
        .get::<AuthContext>()
        .ok_or(AppError::Unauthorized)?;

    if !ctx.user.is_premium {
        return Err(AppError::Forbidden(
            "This feature is only available for premium users".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Verified-email gate. Runs after `require_auth`; checks the claim's
/// flag, not the mirrored directory field.
pub async fn require_verified_email(request: Request, next: Next) -> Result<Response, AppError> {
    let ctx = request
        .extensions()
        .get::<AuthContext>()
        .ok_or(AppError::Unauthorized)?;

    if !ctx.claim.email_verified {
        return Err(AppError::Forbidden(
            "Please verify your email address to access this feature".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
