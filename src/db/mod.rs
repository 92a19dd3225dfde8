// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, TripListQuery};

/// Collection names as constants.
pub mod collections {
    /// User profiles, keyed by subject id
    pub const USERS: &str = "users";
    /// Trip records (searches and saved trips), keyed by UUID
    pub const TRIPS: &str = "trips";
}
