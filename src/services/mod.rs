// SPDX-License-Identifier: MIT

//! Services module - external service boundaries.

pub mod generation;
pub mod identity;
pub mod images;
pub mod places;

pub use generation::{GenerationClient, ItineraryRequest};
pub use identity::{IdentityClaim, IdentityVerifier, VerifyError};
pub use images::{GalleryImage, ImageSearchClient};
pub use places::PlacesClient;
