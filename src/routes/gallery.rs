// SPDX-License-Identifier: MIT

//! Destination image gallery route.

use crate::error::{AppError, Result};
use crate::services::images::{GalleryImage, DEFAULT_IMAGE_LIMIT};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/gallery/search-images", get(search_images))
}

#[derive(Deserialize)]
struct GalleryParams {
    query: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GalleryResponse {
    pub success: bool,
    pub query: String,
    pub count: usize,
    pub images: Vec<GalleryImage>,
}

/// Search destination images.
async fn search_images(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GalleryParams>,
) -> Result<Json<GalleryResponse>> {
    let query = params
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("query parameter is required".to_string()))?;

    let images = state
        .images
        .search(&query, params.limit.unwrap_or(DEFAULT_IMAGE_LIMIT))
        .await?;

    Ok(Json(GalleryResponse {
        success: true,
        count: images.len(),
        query,
        images,
    }))
}
