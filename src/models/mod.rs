// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod trip;
pub mod user;

pub use trip::{TravelCompanion, TripInput, TripRecord, ValidatedTrip};
pub use user::{AuthProvider, ProfilePatch, StatsDelta, User, UserPreferences, UserStats};
