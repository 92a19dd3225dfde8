// SPDX-License-Identifier: MIT

//! Middleware module - request gating and response hardening.

pub mod auth;
pub mod security;

pub use auth::{
    optional_auth, require_auth, require_premium, require_verified_email, AuthContext,
};
pub use security::add_security_headers;
