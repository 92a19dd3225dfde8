// SPDX-License-Identifier: MIT

//! Itinerary generation route.
//!
//! Public with opportunistic auth: anonymous callers get an itinerary,
//! authenticated callers also get it logged to their history.

use crate::error::Result;
use crate::middleware::auth::{optional_auth, MaybeAuth};
use crate::models::trip::{TripDates, TripInput};
use crate::models::{StatsDelta, TravelCompanion, TripRecord};
use crate::services::ItineraryRequest;
use crate::AppState;
use axum::{extract::State, middleware, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/generate-itinerary", post(generate_itinerary))
        .route_layer(middleware::from_fn_with_state(state, optional_auth))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    destination: String,
    days: u32,
    #[serde(default)]
    interest: Option<String>,
    start_date: String,
    end_date: String,
    #[serde(default)]
    budget: Option<f64>,
    #[serde(default)]
    travel_companion: Option<TravelCompanion>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GenerateResponse {
    pub success: bool,
    pub itinerary: String,
    /// Present when the caller was authenticated and the search was
    /// logged to their history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<String>,
}

/// Generate an itinerary.
///
/// Place suggestions are best effort; only the generation call itself
/// can fail the request. History logging after a successful generation
/// is best effort too: the user already has their itinerary.
async fn generate_itinerary(
    State(state): State<Arc<AppState>>,
    MaybeAuth(ctx): MaybeAuth,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    let interest = req
        .interest
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or("general sightseeing")
        .to_string();

    // Reuse trip validation for the dates and destination; the record
    // is only persisted for authenticated callers.
    let trip = TripInput {
        destination: req.destination,
        dates: TripDates {
            start_date: req.start_date,
            end_date: req.end_date,
            days: req.days,
        },
        interests: vec![interest.clone()],
        travel_companion: req.travel_companion,
        budget: req.budget,
        itinerary: String::new(),
    }
    .validate()?;

    let places = state.places.search(&interest, &trip.destination).await;

    let request = ItineraryRequest {
        destination: trip.destination.clone(),
        days: trip.day_count,
        interest,
        start_date: trip.start_date,
        end_date: trip.end_date,
        budget: trip.budget,
        travel_companion: req.travel_companion,
    };

    let itinerary = state.generation.generate(&request, &places).await?;

    let mut search_id = None;
    if let Some(ctx) = ctx {
        let mut trip = trip;
        trip.itinerary = itinerary.clone();
        let record = TripRecord::new(&ctx.user.subject_id, trip, false);

        match state
            .db
            .create_trip(
                &record,
                StatsDelta {
                    searches: 1,
                    itineraries: 1,
                    ..StatsDelta::NONE
                },
            )
            .await
        {
            Ok(()) => search_id = Some(record.id),
            Err(e) => {
                tracing::warn!(
                    subject = %ctx.user.subject_id,
                    error = %e,
                    "Itinerary generated but history logging failed"
                );
            }
        }
    }

    Ok(Json(GenerateResponse {
        success: true,
        itinerary,
        search_id,
    }))
}
