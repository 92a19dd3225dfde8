// SPDX-License-Identifier: MIT

//! Trip history routes: search logging, saved trips, ratings, stats.

use crate::db::TripListQuery;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthContext;
use crate::models::{StatsDelta, TravelCompanion, TripInput, TripRecord};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_LIST_LIMIT: u32 = 10;

/// Trip routes (require authentication via `require_auth`).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/search-history", get(search_history))
        .route("/api/user/saved-trips", get(saved_trips))
        .route("/api/user/trip/{id}", get(get_trip).delete(delete_trip))
        .route("/api/user/stats", get(get_stats))
        .route("/api/user/search", post(log_search))
        .route("/api/user/save-trip", post(save_trip))
        .route("/api/user/save-trip/{id}", put(save_existing_trip))
        .route("/api/user/unsave-trip/{id}", put(unsave_trip))
        .route("/api/user/rate/{id}", post(rate_trip))
}

// ─── Response Types ──────────────────────────────────────────

/// Trip without the itinerary text (which can run to many kilobytes);
/// used by every list response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TripSummary {
    pub id: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub day_count: u32,
    pub interests: Vec<String>,
    pub travel_companion: TravelCompanion,
    pub budget: Option<f64>,
    pub is_saved: bool,
    pub saved_at: Option<String>,
    pub share_link: Option<String>,
    pub rating: Option<u8>,
    pub searched_at: String,
}

/// Full trip record, itinerary text included.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TripDetail {
    #[serde(flatten)]
    pub summary: TripSummary,
    pub itinerary_text: String,
    pub notes: String,
    pub updated_at: String,
}

impl From<TripRecord> for TripSummary {
    fn from(trip: TripRecord) -> Self {
        Self {
            id: trip.id,
            destination: trip.destination,
            start_date: trip.start_date,
            end_date: trip.end_date,
            day_count: trip.day_count,
            interests: trip.interests,
            travel_companion: trip.travel_companion,
            budget: trip.budget,
            is_saved: trip.is_saved,
            saved_at: trip.saved_at,
            share_link: trip.share_link,
            rating: trip.rating,
            searched_at: trip.searched_at,
        }
    }
}

impl From<TripRecord> for TripDetail {
    fn from(trip: TripRecord) -> Self {
        let itinerary_text = trip.itinerary_text.clone();
        let notes = trip.notes.clone();
        let updated_at = trip.updated_at.clone();
        Self {
            summary: trip.into(),
            itinerary_text,
            notes,
            updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TripListResponse {
    pub success: bool,
    pub count: usize,
    pub trips: Vec<TripSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TripMutationResponse {
    pub success: bool,
    pub trip: TripSummary,
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListParams {
    limit: Option<u32>,
    skip: Option<u32>,
    destination: Option<String>,
}

impl ListParams {
    fn into_query(self, saved_only: bool) -> TripListQuery {
        TripListQuery {
            saved_only,
            limit: self.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            skip: self.skip.unwrap_or(0),
            destination: self
                .destination
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

/// List past searches, newest first.
async fn search_history(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> Result<Json<TripListResponse>> {
    let trips = state
        .db
        .list_trips(&ctx.user.subject_id, &params.into_query(false))
        .await?;

    Ok(Json(list_response(trips)))
}

/// List saved trips, newest first.
async fn saved_trips(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> Result<Json<TripListResponse>> {
    let trips = state
        .db
        .list_trips(&ctx.user.subject_id, &params.into_query(true))
        .await?;

    Ok(Json(list_response(trips)))
}

fn list_response(trips: Vec<TripRecord>) -> TripListResponse {
    let trips: Vec<TripSummary> = trips.into_iter().map(Into::into).collect();
    TripListResponse {
        success: true,
        count: trips.len(),
        trips,
    }
}

/// Fetch a single trip with its full itinerary text.
async fn get_trip(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<TripDetail>> {
    let trip = state
        .db
        .find_owned_trip(&id, &ctx.user.subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    Ok(Json(trip.into()))
}

// ─── Stats ───────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStatsResponse {
    pub total_searches: u32,
    pub total_itineraries: u32,
    pub saved_trips: u32,
    pub recent_searches: Vec<TripSummary>,
    pub saved: Vec<TripSummary>,
}

/// Dashboard stats: counters plus the most recent activity.
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<UserStatsResponse>> {
    let owner = &ctx.user.subject_id;

    // Counters come from the directory, not from counting trips: the
    // totals survive trip deletion.
    let stats = state.db.get_user_stats(owner).await?;

    let recent = state
        .db
        .list_trips(
            owner,
            &TripListQuery {
                saved_only: false,
                limit: 5,
                skip: 0,
                destination: None,
            },
        )
        .await?;
    let saved = state
        .db
        .list_trips(
            owner,
            &TripListQuery {
                saved_only: true,
                limit: DEFAULT_LIST_LIMIT,
                skip: 0,
                destination: None,
            },
        )
        .await?;

    Ok(Json(UserStatsResponse {
        total_searches: stats.total_searches,
        total_itineraries: stats.total_itineraries,
        saved_trips: stats.saved_trips,
        recent_searches: recent.into_iter().map(Into::into).collect(),
        saved: saved.into_iter().map(Into::into).collect(),
    }))
}

// ─── Creation ────────────────────────────────────────────────

/// Log a search to the user's history.
async fn log_search(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<TripInput>,
) -> Result<Json<TripMutationResponse>> {
    let trip = input.validate()?;
    let record = TripRecord::new(&ctx.user.subject_id, trip, false);

    state
        .db
        .create_trip(
            &record,
            StatsDelta {
                searches: 1,
                ..StatsDelta::NONE
            },
        )
        .await?;

    Ok(Json(TripMutationResponse {
        success: true,
        trip: record.into(),
    }))
}

/// Persist a trip as saved in one step (search plus save).
async fn save_trip(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<TripInput>,
) -> Result<Json<TripMutationResponse>> {
    let trip = input.validate()?;
    let record = TripRecord::new(&ctx.user.subject_id, trip, true);

    state
        .db
        .create_trip(
            &record,
            StatsDelta {
                searches: 1,
                saved: 1,
                ..StatsDelta::NONE
            },
        )
        .await?;

    Ok(Json(TripMutationResponse {
        success: true,
        trip: record.into(),
    }))
}

// ─── Save / Unsave / Rate / Delete ───────────────────────────

/// Mark an existing trip as saved. Idempotent: re-saving changes
/// nothing and the counter moves at most once.
async fn save_existing_trip(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<TripMutationResponse>> {
    let trip = state
        .db
        .set_trip_saved(&id, &ctx.user.subject_id, true)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    Ok(Json(TripMutationResponse {
        success: true,
        trip: trip.into(),
    }))
}

/// Remove a trip from the saved list. Also idempotent.
async fn unsave_trip(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<TripMutationResponse>> {
    let trip = state
        .db
        .set_trip_saved(&id, &ctx.user.subject_id, false)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    Ok(Json(TripMutationResponse {
        success: true,
        trip: trip.into(),
    }))
}

#[derive(Deserialize)]
struct RateRequest {
    rating: Option<u8>,
}

/// Rate a trip (1-5). The bounds check runs before the lookup so a bad
/// rating for someone else's trip is a 400, not a 404.
async fn rate_trip(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<RateRequest>,
) -> Result<Json<TripMutationResponse>> {
    let rating = crate::models::trip::validate_rating(req.rating)?;

    let trip = state
        .db
        .rate_trip(&id, &ctx.user.subject_id, rating)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    Ok(Json(TripMutationResponse {
        success: true,
        trip: trip.into(),
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteTripResponse {
    pub success: bool,
    pub message: String,
}

/// Delete a trip. If it was saved, the saved counter goes down with it.
async fn delete_trip(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteTripResponse>> {
    let deleted = state.db.delete_trip(&id, &ctx.user.subject_id).await?;
    if !deleted {
        return Err(AppError::NotFound("Trip not found".to_string()));
    }

    Ok(Json(DeleteTripResponse {
        success: true,
        message: "Trip deleted".to_string(),
    }))
}
