// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

use crate::services::identity::IdentityClaim;
use crate::time_utils::now_rfc3339;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Upstream identity provider a user signed up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Email,
    Google,
    Facebook,
    Github,
}

impl AuthProvider {
    /// Map a Firebase `sign_in_provider` claim (e.g. "google.com",
    /// "password") to a provider. Unknown providers fall back to email.
    pub fn from_sign_in_provider(provider: Option<&str>) -> Self {
        match provider {
            Some("google.com") => Self::Google,
            Some("facebook.com") => Self::Facebook,
            Some("github.com") => Self::Github,
            _ => Self::Email,
        }
    }
}

/// Per-user preference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub dark_mode: bool,
    pub default_interests: Vec<String>,
    pub currency: String,
    pub language: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            default_interests: Vec::new(),
            currency: "INR".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Denormalized usage counters stored on the user document.
///
/// Kept consistent with trip records by updating them in the same
/// Firestore transaction as the trip write.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserStats {
    pub total_searches: u32,
    pub total_itineraries: u32,
    pub saved_trips: u32,
}

/// Counter changes produced by a trip-store mutation.
///
/// Trip operations report deltas; the user directory applies them so
/// counter arithmetic lives in exactly one place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsDelta {
    pub searches: u32,
    pub itineraries: u32,
    /// Signed: save transitions are +1, unsave/delete-of-saved are -1.
    pub saved: i32,
}

impl StatsDelta {
    pub const NONE: Self = Self {
        searches: 0,
        itineraries: 0,
        saved: 0,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

impl UserStats {
    /// Apply a delta. Decrements clamp at zero rather than underflowing.
    pub fn apply(&mut self, delta: StatsDelta) {
        self.total_searches += delta.searches;
        self.total_itineraries += delta.itineraries;
        if delta.saved >= 0 {
            self.saved_trips += delta.saved as u32;
        } else {
            self.saved_trips = self.saved_trips.saturating_sub(delta.saved.unsigned_abs());
        }
    }
}

/// Partial profile update. `None` fields leave the stored values
/// untouched; the patch never carries stats or account gates, so
/// applying it cannot overwrite counters.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub dark_mode: Option<bool>,
    pub default_interests: Option<Vec<String>>,
    pub currency: Option<String>,
    pub language: Option<String>,
}

impl ProfilePatch {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.display_name {
            user.display_name = name.clone();
        }
        if let Some(url) = &self.avatar_url {
            user.avatar_url = Some(url.clone());
        }
        if let Some(dark_mode) = self.dark_mode {
            user.preferences.dark_mode = dark_mode;
        }
        if let Some(interests) = &self.default_interests {
            user.preferences.default_interests = interests.clone();
        }
        if let Some(currency) = &self.currency {
            user.preferences.currency = currency.clone();
        }
        if let Some(language) = &self.language {
            user.preferences.language = language.clone();
        }
        user.updated_at = now_rfc3339();
    }
}

/// User profile stored in Firestore, keyed by the Firebase subject id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Firebase UID (also used as document ID). Immutable after creation.
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    #[serde(default)]
    pub auth_provider: AuthProvider,
    #[serde(default)]
    pub preferences: UserPreferences,
    /// Deactivation gate: false freezes authentication without deleting.
    pub is_active: bool,
    /// Feature gate for premium-only routes.
    pub is_premium: bool,
    #[serde(default)]
    pub stats: UserStats,
    pub last_login: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Build a fresh user from a verified identity claim (first sync).
    pub fn from_claim(claim: &IdentityClaim) -> Self {
        let now = now_rfc3339();
        Self {
            subject_id: claim.subject_id.clone(),
            email: claim.email.clone(),
            display_name: claim
                .display_name
                .clone()
                .unwrap_or_else(|| local_part(&claim.email)),
            avatar_url: claim.picture.clone(),
            email_verified: claim.email_verified,
            auth_provider: AuthProvider::from_sign_in_provider(claim.sign_in_provider.as_deref()),
            preferences: UserPreferences::default(),
            is_active: true,
            is_premium: false,
            stats: UserStats::default(),
            last_login: now.clone(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Refresh mirror fields from a claim on a subsequent sync.
    /// Missing claim fields leave the stored values untouched.
    pub fn sync_from_claim(&mut self, claim: &IdentityClaim) {
        if let Some(name) = &claim.display_name {
            self.display_name = name.clone();
        }
        if claim.picture.is_some() {
            self.avatar_url = claim.picture.clone();
        }
        if claim.email_verified {
            self.email_verified = true;
        }
        let now = now_rfc3339();
        self.last_login = now.clone();
        self.updated_at = now;
    }
}

/// "alice@example.com" -> "alice"
fn local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
