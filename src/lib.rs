// SPDX-License-Identifier: MIT

//! TripSmith: AI-assisted travel itinerary backend
//!
//! This crate provides the backend API for generating travel itineraries,
//! keeping a per-user trip history, and serving destination image
//! galleries. Authentication is delegated to Firebase.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{GenerationClient, IdentityVerifier, ImageSearchClient, PlacesClient};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: Arc<IdentityVerifier>,
    pub places: PlacesClient,
    pub generation: GenerationClient,
    pub images: ImageSearchClient,
}
