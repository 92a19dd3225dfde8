// SPDX-License-Identifier: MIT

//! LocationIQ place search client.
//!
//! Place suggestions only enrich the generation prompt, so every failure
//! mode (missing key, timeout, bad response) degrades to an empty list.

use serde::Deserialize;
use std::time::Duration;

const SEARCH_URL: &str = "https://us1.locationiq.com/v1/search.php";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_PLACES: usize = 10;

/// LocationIQ search client.
#[derive(Clone)]
pub struct PlacesClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    display_name: String,
}

impl PlacesClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Search for places matching an interest in a destination.
    ///
    /// Returns up to ten leading place names (the part of the display
    /// name before the first comma), or an empty list on any failure.
    pub async fn search(&self, interest: &str, destination: &str) -> Vec<String> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!("LOCATIONIQ_API_KEY not set, skipping place search");
            return Vec::new();
        };

        let query = format!("{interest} in {destination}");

        let response = self
            .http
            .get(SEARCH_URL)
            .timeout(HTTP_TIMEOUT)
            .query(&[
                ("key", api_key.as_str()),
                ("q", query.as_str()),
                ("format", "json"),
                ("limit", "10"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), "LocationIQ returned non-success status");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "LocationIQ request failed, continuing without places");
                return Vec::new();
            }
        };

        let places: Vec<PlaceResult> = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid LocationIQ response");
                return Vec::new();
            }
        };

        let names: Vec<String> = places
            .iter()
            .map(|p| leading_name(&p.display_name))
            .filter(|n| !n.is_empty())
            .take(MAX_PLACES)
            .collect();

        tracing::debug!(count = names.len(), query = %query, "Places found");
        names
    }
}

/// "Louvre Museum, Rue de Rivoli, Paris" -> "Louvre Museum"
fn leading_name(display_name: &str) -> String {
    display_name
        .split(',')
        .next()
        .unwrap_or(display_name)
        .trim()
        .to_string()
}
