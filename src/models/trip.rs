// SPDX-License-Identifier: MIT

//! Trip record model: one persisted itinerary search or save.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::time_utils::now_rfc3339;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Who the user is travelling with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TravelCompanion {
    #[default]
    Solo,
    Couple,
    Family,
    Friends,
    Group,
}

/// Trip record stored in Firestore. Owned by exactly one user; the owner
/// is part of every lookup predicate so cross-user access surfaces as
/// not-found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRecord {
    /// Document ID (UUIDv4)
    pub id: String,
    /// Owning user's subject id
    pub subject_id: String,
    pub destination: String,
    /// Travel dates (YYYY-MM-DD)
    pub start_date: String,
    pub end_date: String,
    /// Inclusive day span; validated against the dates on creation
    pub day_count: u32,
    pub interests: Vec<String>,
    pub travel_companion: TravelCompanion,
    pub budget: Option<f64>,
    /// Generated itinerary text (large; omitted from list responses)
    pub itinerary_text: String,
    pub is_saved: bool,
    /// Set exactly when `is_saved` is true
    pub saved_at: Option<String>,
    pub share_link: Option<String>,
    /// 1..=5 when present
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: String,
    pub searched_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Travel dates as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDates {
    pub start_date: String,
    pub end_date: String,
    pub days: u32,
}

/// Inbound payload for `POST /api/user/search` and `POST /api/user/save-trip`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripInput {
    pub destination: String,
    pub dates: TripDates,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub travel_companion: Option<TravelCompanion>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub itinerary: String,
}

/// A trip input that passed validation, with normalized fields.
#[derive(Debug, Clone)]
pub struct ValidatedTrip {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub day_count: u32,
    pub interests: Vec<String>,
    pub travel_companion: TravelCompanion,
    pub budget: Option<f64>,
    pub itinerary: String,
}

impl TripInput {
    /// Validate and normalize the payload before any I/O.
    pub fn validate(self) -> Result<ValidatedTrip, AppError> {
        let destination = self.destination.trim().to_string();
        if destination.is_empty() {
            return Err(AppError::BadRequest("destination is required".to_string()));
        }

        let start_date = parse_date(&self.dates.start_date)?;
        let end_date = parse_date(&self.dates.end_date)?;
        if end_date < start_date {
            return Err(AppError::BadRequest(
                "endDate must not be before startDate".to_string(),
            ));
        }

        // Inclusive span: a same-day trip is 1 day.
        let span = (end_date - start_date).num_days() as u32 + 1;
        if self.dates.days != span {
            return Err(AppError::BadRequest(format!(
                "days must match the date span ({} expected, got {})",
                span, self.dates.days
            )));
        }

        if let Some(budget) = self.budget {
            if !budget.is_finite() || budget < 0.0 {
                return Err(AppError::BadRequest(
                    "budget must be a non-negative number".to_string(),
                ));
            }
        }

        Ok(ValidatedTrip {
            destination,
            start_date,
            end_date,
            day_count: span,
            interests: normalize_interests(self.interests),
            travel_companion: self.travel_companion.unwrap_or_default(),
            budget: self.budget,
            itinerary: self.itinerary,
        })
    }
}

impl TripRecord {
    /// Build a new trip record for an owner.
    ///
    /// `saved` distinguishes `save-trip` from a plain `search`. Saved
    /// trips get `saved_at` and a share link at creation.
    pub fn new(subject_id: &str, trip: ValidatedTrip, saved: bool) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();

        Self {
            share_link: saved.then(|| share_link_for(&id)),
            saved_at: saved.then(|| now.clone()),
            is_saved: saved,
            id,
            subject_id: subject_id.to_string(),
            destination: trip.destination,
            start_date: trip.start_date.to_string(),
            end_date: trip.end_date.to_string(),
            day_count: trip.day_count,
            interests: trip.interests,
            travel_companion: trip.travel_companion,
            budget: trip.budget,
            itinerary_text: trip.itinerary,
            rating: None,
            notes: String::new(),
            searched_at: now.clone(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Transition to saved. Returns false if the trip was already saved
    /// (idempotent re-save must not double-count).
    pub fn mark_saved(&mut self) -> bool {
        if self.is_saved {
            return false;
        }
        let now = now_rfc3339();
        self.is_saved = true;
        self.saved_at = Some(now.clone());
        if self.share_link.is_none() {
            self.share_link = Some(share_link_for(&self.id));
        }
        self.updated_at = now;
        true
    }

    /// Transition to unsaved (`saved_at` is always nulled with it).
    /// Returns false if the trip was not saved.
    pub fn mark_unsaved(&mut self) -> bool {
        if !self.is_saved {
            return false;
        }
        self.is_saved = false;
        self.saved_at = None;
        self.updated_at = now_rfc3339();
        true
    }

    /// Set the rating. Bounds are the caller's responsibility (validated
    /// at the route boundary before any lookup happens).
    pub fn set_rating(&mut self, rating: u8) {
        self.rating = Some(rating);
        self.updated_at = now_rfc3339();
    }
}

/// Validate a rating from an inbound payload.
pub fn validate_rating(rating: Option<u8>) -> Result<u8, AppError> {
    match rating {
        Some(r) if (1..=5).contains(&r) => Ok(r),
        _ => Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        )),
    }
}

fn share_link_for(id: &str) -> String {
    format!("/shared/{id}")
}

/// Accept "YYYY-MM-DD" or a full RFC3339 timestamp (the frontend sends
/// either depending on the form widget).
fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| AppError::BadRequest(format!("invalid date: {raw}")))
}

/// Trim, drop empties, dedupe preserving first occurrence.
fn normalize_interests(interests: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    interests
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .filter(|i| seen.insert(i.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(start: &str, end: &str, days: u32) -> TripInput {
        TripInput {
            destination: "Paris".to_string(),
            dates: TripDates {
                start_date: start.to_string(),
                end_date: end.to_string(),
                days,
            },
            interests: vec![
                " museums ".to_string(),
                "Food".to_string(),
                "food".to_string(),
                String::new(),
            ],
            travel_companion: None,
            budget: None,
            itinerary: String::new(),
        }
    }

    #[test]
    fn test_validate_normalizes_interests() {
        let trip = input("2026-06-01", "2026-06-03", 3).validate().unwrap();
        assert_eq!(trip.interests, vec!["museums", "Food"]);
        assert_eq!(trip.travel_companion, TravelCompanion::Solo);
    }

    #[test]
    fn test_validate_rejects_day_count_mismatch() {
        let err = input("2026-06-01", "2026-06-03", 5).validate().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_validate_rejects_reversed_dates() {
        let err = input("2026-06-03", "2026-06-01", 3).validate().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_validate_accepts_rfc3339_dates() {
        let trip = input("2026-06-01T00:00:00Z", "2026-06-01T10:00:00Z", 1)
            .validate()
            .unwrap();
        assert_eq!(trip.day_count, 1);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating(Some(0)).is_err());
        assert!(validate_rating(Some(6)).is_err());
        assert!(validate_rating(None).is_err());
        assert_eq!(validate_rating(Some(1)).unwrap(), 1);
        assert_eq!(validate_rating(Some(5)).unwrap(), 5);
    }

    #[test]
    fn test_mark_saved_is_idempotent() {
        let trip = input("2026-06-01", "2026-06-03", 3).validate().unwrap();
        let mut record = TripRecord::new("u1", trip, false);
        assert!(record.saved_at.is_none());

        assert!(record.mark_saved());
        assert!(record.saved_at.is_some());
        assert!(record.share_link.is_some());

        // Second save is a no-op for counting purposes
        assert!(!record.mark_saved());
    }

    #[test]
    fn test_unsave_nulls_saved_at() {
        let trip = input("2026-06-01", "2026-06-03", 3).validate().unwrap();
        let mut record = TripRecord::new("u1", trip, true);
        assert!(record.is_saved);
        assert!(record.saved_at.is_some());

        assert!(record.mark_unsaved());
        assert!(!record.is_saved);
        assert!(record.saved_at.is_none());

        // Already unsaved: no decrement should be reported
        assert!(!record.mark_unsaved());
    }
}
