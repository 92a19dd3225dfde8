// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! All external API keys are optional: a missing key disables the feature
//! that needs it (the affected routes return 503) instead of preventing
//! the server from starting.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase project ID (issuer/audience for ID token verification).
    /// `None` leaves the identity verifier unconfigured.
    pub firebase_project_id: Option<String>,
    /// Firebase Web API key, used for owner-credential Identity Toolkit
    /// calls (profile propagation, account deletion).
    pub firebase_api_key: Option<String>,
    /// LocationIQ place search API key
    pub locationiq_api_key: Option<String>,
    /// Gemini generative API key
    pub gemini_api_key: Option<String>,
    /// SERP API key (image gallery search)
    pub serp_api_key: Option<String>,
    /// GCP project ID for Firestore (defaults to the Firebase project)
    pub gcp_project_id: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        let firebase_project_id = env::var("FIREBASE_PROJECT_ID").ok().map(trimmed);
        let gcp_project_id = env::var("GCP_PROJECT_ID")
            .ok()
            .map(trimmed)
            .or_else(|| firebase_project_id.clone())
            .unwrap_or_else(|| "local-dev".to_string());

        Self {
            firebase_project_id,
            firebase_api_key: env::var("FIREBASE_API_KEY").ok().map(trimmed),
            locationiq_api_key: env::var("LOCATIONIQ_API_KEY").ok().map(trimmed),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().map(trimmed),
            serp_api_key: env::var("SERP_API_KEY").ok().map(trimmed),
            gcp_project_id,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
        }
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: Some("test-project".to_string()),
            firebase_api_key: Some("test_api_key".to_string()),
            locationiq_api_key: None,
            gemini_api_key: None,
            serp_api_key: None,
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 3001,
        }
    }
}

fn trimmed(v: String) -> String {
    v.trim().to_string()
}
