// SPDX-License-Identifier: MIT

//! SERP API image search for the destination gallery.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AppError;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const SEARCH_URL: &str = "https://serpapi.com/search";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_IMAGE_LIMIT: usize = 12;
pub const MAX_IMAGE_LIMIT: usize = 15;

/// One gallery image, shaped for the frontend.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GalleryImage {
    pub url: String,
    pub thumbnail: String,
    pub title: String,
    pub source_url: String,
    pub position: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// SERP API (Google Images) client.
#[derive(Clone)]
pub struct ImageSearchClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    images_results: Vec<SerpImage>,
}

#[derive(Debug, Deserialize)]
struct SerpImage {
    original: Option<String>,
    thumbnail: Option<String>,
    title: Option<String>,
    source: Option<String>,
    position: Option<u32>,
    original_width: Option<u32>,
    original_height: Option<u32>,
}

impl ImageSearchClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Search destination images. `limit` is clamped to [1, 15].
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<GalleryImage>, AppError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AppError::Unavailable("image search is not configured".to_string())
        })?;

        let limit = limit.clamp(1, MAX_IMAGE_LIMIT);
        let q = format!("{query} travel destination");

        let response = self
            .http
            .get(SEARCH_URL)
            .timeout(HTTP_TIMEOUT)
            .query(&[
                ("api_key", api_key.as_str()),
                ("engine", "google_images"),
                ("q", q.as_str()),
                ("google_domain", "google.com"),
                ("tbm", "isch"),
                ("ijn", "0"),
                ("num", &limit.to_string()),
                ("safe", "active"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("image search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Unavailable(format!(
                "image search returned status {}",
                response.status()
            )));
        }

        let parsed: SerpResponse = response
            .json()
            .await
            .map_err(|e| AppError::Unavailable(format!("invalid image search response: {e}")))?;

        let images: Vec<GalleryImage> = parsed
            .images_results
            .into_iter()
            .filter_map(format_image)
            .take(limit)
            .collect();

        tracing::debug!(query = %query, count = images.len(), "Image search complete");
        Ok(images)
    }
}

fn format_image(item: SerpImage) -> Option<GalleryImage> {
    let thumbnail = item.thumbnail?;
    Some(GalleryImage {
        url: item.original.unwrap_or_else(|| thumbnail.clone()),
        thumbnail,
        title: item.title.unwrap_or_else(|| "Travel Destination".to_string()),
        source_url: item.source.unwrap_or_else(|| "Web".to_string()),
        position: item.position,
        width: item.original_width,
        height: item.original_height,
    })
}
