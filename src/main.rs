// SPDX-License-Identifier: MIT

//! TripSmith API Server
//!
//! Generates AI travel itineraries and keeps a per-user history of
//! searched and saved trips. Identity comes from Firebase; data lives
//! in Firestore.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripsmith::{
    config::Config,
    db::FirestoreDb,
    services::{GenerationClient, IdentityVerifier, ImageSearchClient, PlacesClient},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env();
    tracing::info!(port = config.port, "Starting TripSmith API");

    // Initialize Firestore. A connection failure degrades rather than
    // aborts: stateless routes keep working and database-backed ones
    // report 503 until the next restart.
    let db = match FirestoreDb::new(&config.gcp_project_id).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Firestore unavailable, starting without a database");
            FirestoreDb::new_mock()
        }
    };

    let identity =
        Arc::new(IdentityVerifier::new(&config).expect("Failed to initialize identity verifier"));

    let places = PlacesClient::new(config.locationiq_api_key.clone());
    let generation = GenerationClient::new(config.gemini_api_key.clone());
    let images = ImageSearchClient::new(config.serp_api_key.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        places,
        generation,
        images,
    });

    // Build router
    let app = tripsmith::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tripsmith=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
