// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, denormalized stats counters)
//! - Trip records (owner-scoped history of searches and saved trips)
//!
//! Counter updates ride in the same Firestore transaction as the trip
//! write. Every in-transaction read goes through a client carrying the
//! transaction's consistency selector, so a concurrent write to a read
//! document aborts the commit; aborted commits are retried a bounded
//! number of times.

use crate::db::collections;
use crate::error::AppError;
use crate::models::user::ProfilePatch;
use crate::models::{StatsDelta, TripRecord, User, UserStats};
use crate::services::identity::IdentityClaim;
use crate::time_utils::now_rfc3339;
use firestore::errors::FirestoreError;
use firestore::FirestoreConsistencySelector;
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;
const MAX_TXN_ATTEMPTS: u32 = 3;

/// Owner-scoped listing options for trip queries.
#[derive(Debug, Clone, Default)]
pub struct TripListQuery {
    pub saved_only: bool,
    pub limit: u32,
    pub skip: u32,
    /// Case-insensitive substring match on the destination
    pub destination: Option<String>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// True for commit failures caused by a concurrent write; those are
/// safe to retry from the top of the transaction.
fn is_conflict(err: &FirestoreError) -> bool {
    matches!(err, FirestoreError::DatabaseError(db_err) if db_err.retry_possible)
}

fn db_error(err: FirestoreError) -> AppError {
    AppError::Database(err.to_string())
}

/// Run a transactional operation, retrying when the commit is aborted
/// by a conflicting write. Each attempt begins a fresh transaction and
/// re-reads its documents.
async fn retry_on_conflict<T, F, Fut>(op: &'static str, attempt_fn: F) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, FirestoreError>>,
{
    let mut attempt = 1;
    loop {
        match attempt_fn().await {
            Err(e) if attempt < MAX_TXN_ATTEMPTS && is_conflict(&e) => {
                tracing::debug!(op, attempt, error = %e, "Transaction conflict, retrying");
                attempt += 1;
            }
            Err(e) => return Err(db_error(e)),
            Ok(value) => return Ok(value),
        }
    }
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client with no connection (offline mode).
    ///
    /// Used by tests and as the degraded state when startup cannot
    /// reach Firestore. All database operations report 503.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or report the degraded state.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Database not connected".to_string()))
    }

    /// Clone of the client whose reads are attached to `transaction`.
    fn txn_reader(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        client.clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ))
    }

    async fn read_user_with(
        client: &firestore::FirestoreDb,
        subject_id: &str,
    ) -> Result<Option<User>, FirestoreError> {
        client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(subject_id)
            .await
    }

    async fn read_owned_trip_with(
        client: &firestore::FirestoreDb,
        trip_id: &str,
        subject_id: &str,
    ) -> Result<Option<TripRecord>, FirestoreError> {
        let trip: Option<TripRecord> = client
            .fluent()
            .select()
            .by_id_in(collections::TRIPS)
            .obj()
            .one(trip_id)
            .await?;

        Ok(trip.filter(|t| t.subject_id == subject_id))
    }

    /// Stage a full-document user write on a transaction.
    fn stage_user_write(
        client: &firestore::FirestoreDb,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        user: &User,
    ) -> Result<(), FirestoreError> {
        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.subject_id)
            .object(user)
            .add_to_transaction(transaction)?;
        Ok(())
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by their subject id.
    pub async fn get_user(&self, subject_id: &str) -> Result<Option<User>, AppError> {
        Self::read_user_with(self.get_client()?, subject_id)
            .await
            .map_err(db_error)
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.subject_id)
            .object(user)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Find-or-create a user from a verified identity claim.
    ///
    /// The read is part of the transaction, so two first-sync requests
    /// racing on the same subject id converge on one document: the
    /// loser's commit aborts and its retry sees the winner's write.
    /// Returns the user and whether it was created.
    pub async fn sync_user_from_claim(
        &self,
        claim: &IdentityClaim,
    ) -> Result<(User, bool), AppError> {
        let client = self.get_client()?;
        retry_on_conflict("sync_user", || Self::sync_user_once(client, claim)).await
    }

    async fn sync_user_once(
        client: &firestore::FirestoreDb,
        claim: &IdentityClaim,
    ) -> Result<(User, bool), FirestoreError> {
        let mut transaction = client.begin_transaction().await?;
        let reader = Self::txn_reader(client, &transaction);

        let existing = Self::read_user_with(&reader, &claim.subject_id).await?;

        let (user, created) = match existing {
            Some(mut user) => {
                user.sync_from_claim(claim);
                (user, false)
            }
            None => (User::from_claim(claim), true),
        };

        Self::stage_user_write(client, &mut transaction, &user)?;
        transaction.commit().await?;

        Ok((user, created))
    }

    /// Apply counter deltas to a user's stats document.
    ///
    /// Transactional read-modify-write with the read attached to the
    /// transaction, so concurrent increments on the same user cannot
    /// lose updates. A missing user is logged and skipped: an
    /// inconsistent counter is preferable to failing the primary
    /// operation that produced the delta.
    pub async fn apply_stats_delta(
        &self,
        subject_id: &str,
        delta: StatsDelta,
    ) -> Result<(), AppError> {
        if delta.is_empty() {
            return Ok(());
        }

        let client = self.get_client()?;
        retry_on_conflict("apply_stats_delta", || {
            Self::apply_stats_delta_once(client, subject_id, delta)
        })
        .await
    }

    async fn apply_stats_delta_once(
        client: &firestore::FirestoreDb,
        subject_id: &str,
        delta: StatsDelta,
    ) -> Result<(), FirestoreError> {
        let mut transaction = client.begin_transaction().await?;
        let reader = Self::txn_reader(client, &transaction);

        let Some(mut user) = Self::read_user_with(&reader, subject_id).await? else {
            tracing::warn!(subject_id, "Stats delta for missing user, skipping");
            let _ = transaction.rollback().await;
            return Ok(());
        };

        user.stats.apply(delta);
        user.updated_at = now_rfc3339();

        Self::stage_user_write(client, &mut transaction, &user)?;
        transaction.commit().await?;

        Ok(())
    }

    /// Apply a profile patch to the stored user document.
    ///
    /// The user is re-read inside the transaction rather than taken
    /// from the caller, so a patch cannot write a stale stats snapshot
    /// over a counter update that landed since authentication.
    /// Returns `None` when the user document no longer exists.
    pub async fn update_user_profile(
        &self,
        subject_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<User>, AppError> {
        let client = self.get_client()?;
        retry_on_conflict("update_user_profile", || {
            Self::update_user_profile_once(client, subject_id, patch)
        })
        .await
    }

    async fn update_user_profile_once(
        client: &firestore::FirestoreDb,
        subject_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<User>, FirestoreError> {
        let mut transaction = client.begin_transaction().await?;
        let reader = Self::txn_reader(client, &transaction);

        let Some(mut user) = Self::read_user_with(&reader, subject_id).await? else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        patch.apply_to(&mut user);

        Self::stage_user_write(client, &mut transaction, &user)?;
        transaction.commit().await?;

        Ok(Some(user))
    }

    /// Get a user's stats, defaulting when the user is missing.
    pub async fn get_user_stats(&self, subject_id: &str) -> Result<UserStats, AppError> {
        Ok(self
            .get_user(subject_id)
            .await?
            .map(|u| u.stats)
            .unwrap_or_default())
    }

    // ─── Trip Operations ─────────────────────────────────────────

    /// Owner-scoped single-trip fetch.
    ///
    /// The owner is part of the lookup predicate: a trip owned by a
    /// different user yields `None`, indistinguishable from a trip that
    /// does not exist. Every mutating operation goes through this.
    pub async fn find_owned_trip(
        &self,
        trip_id: &str,
        subject_id: &str,
    ) -> Result<Option<TripRecord>, AppError> {
        Self::read_owned_trip_with(self.get_client()?, trip_id, subject_id)
            .await
            .map_err(db_error)
    }

    /// Persist a new trip record and apply its counter delta atomically.
    pub async fn create_trip(&self, trip: &TripRecord, delta: StatsDelta) -> Result<(), AppError> {
        let client = self.get_client()?;
        retry_on_conflict("create_trip", || Self::create_trip_once(client, trip, delta)).await
    }

    async fn create_trip_once(
        client: &firestore::FirestoreDb,
        trip: &TripRecord,
        delta: StatsDelta,
    ) -> Result<(), FirestoreError> {
        let mut transaction = client.begin_transaction().await?;
        let reader = Self::txn_reader(client, &transaction);

        client
            .fluent()
            .update()
            .in_col(collections::TRIPS)
            .document_id(&trip.id)
            .object(trip)
            .add_to_transaction(&mut transaction)?;

        if !delta.is_empty() {
            if let Some(mut user) = Self::read_user_with(&reader, &trip.subject_id).await? {
                user.stats.apply(delta);
                user.updated_at = now_rfc3339();
                Self::stage_user_write(client, &mut transaction, &user)?;
            } else {
                tracing::warn!(
                    subject_id = %trip.subject_id,
                    "Trip owner missing while applying stats, writing trip only"
                );
            }
        }

        transaction.commit().await?;
        Ok(())
    }

    /// Toggle a trip's saved state, counting transitions exactly once.
    ///
    /// Returns the updated trip, or `None` when no record matches
    /// `(trip_id, owner)`. Re-saving an already-saved trip (or
    /// re-unsaving) changes nothing and adjusts no counter.
    pub async fn set_trip_saved(
        &self,
        trip_id: &str,
        subject_id: &str,
        saved: bool,
    ) -> Result<Option<TripRecord>, AppError> {
        let client = self.get_client()?;
        retry_on_conflict("set_trip_saved", || {
            Self::set_trip_saved_once(client, trip_id, subject_id, saved)
        })
        .await
    }

    async fn set_trip_saved_once(
        client: &firestore::FirestoreDb,
        trip_id: &str,
        subject_id: &str,
        saved: bool,
    ) -> Result<Option<TripRecord>, FirestoreError> {
        let mut transaction = client.begin_transaction().await?;
        let reader = Self::txn_reader(client, &transaction);

        let Some(mut trip) = Self::read_owned_trip_with(&reader, trip_id, subject_id).await? else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        let transitioned = if saved {
            trip.mark_saved()
        } else {
            trip.mark_unsaved()
        };

        if !transitioned {
            // Idempotent repeat: nothing to write
            let _ = transaction.rollback().await;
            return Ok(Some(trip));
        }

        client
            .fluent()
            .update()
            .in_col(collections::TRIPS)
            .document_id(&trip.id)
            .object(&trip)
            .add_to_transaction(&mut transaction)?;

        let delta = StatsDelta {
            saved: if saved { 1 } else { -1 },
            ..StatsDelta::NONE
        };

        if let Some(mut user) = Self::read_user_with(&reader, subject_id).await? {
            user.stats.apply(delta);
            user.updated_at = now_rfc3339();
            Self::stage_user_write(client, &mut transaction, &user)?;
        }

        transaction.commit().await?;
        Ok(Some(trip))
    }

    /// Set a trip's rating. Bounds are validated at the route boundary.
    pub async fn rate_trip(
        &self,
        trip_id: &str,
        subject_id: &str,
        rating: u8,
    ) -> Result<Option<TripRecord>, AppError> {
        let Some(mut trip) = self.find_owned_trip(trip_id, subject_id).await? else {
            return Ok(None);
        };

        trip.set_rating(rating);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TRIPS)
            .document_id(&trip.id)
            .object(&trip)
            .execute()
            .await
            .map_err(db_error)?;

        Ok(Some(trip))
    }

    /// Delete a trip, decrementing `saved_trips` when it was saved.
    ///
    /// Returns false when no record matches `(trip_id, owner)`.
    pub async fn delete_trip(&self, trip_id: &str, subject_id: &str) -> Result<bool, AppError> {
        let client = self.get_client()?;
        retry_on_conflict("delete_trip", || {
            Self::delete_trip_once(client, trip_id, subject_id)
        })
        .await
    }

    async fn delete_trip_once(
        client: &firestore::FirestoreDb,
        trip_id: &str,
        subject_id: &str,
    ) -> Result<bool, FirestoreError> {
        let mut transaction = client.begin_transaction().await?;
        let reader = Self::txn_reader(client, &transaction);

        let Some(trip) = Self::read_owned_trip_with(&reader, trip_id, subject_id).await? else {
            let _ = transaction.rollback().await;
            return Ok(false);
        };

        client
            .fluent()
            .delete()
            .from(collections::TRIPS)
            .document_id(&trip.id)
            .add_to_transaction(&mut transaction)?;

        if trip.is_saved {
            if let Some(mut user) = Self::read_user_with(&reader, subject_id).await? {
                user.stats.apply(StatsDelta {
                    saved: -1,
                    ..StatsDelta::NONE
                });
                user.updated_at = now_rfc3339();
                Self::stage_user_write(client, &mut transaction, &user)?;
            }
        }

        transaction.commit().await?;
        Ok(true)
    }

    /// List a user's trips, newest-first by search time.
    ///
    /// The destination filter is a case-insensitive substring match.
    /// Firestore cannot express that, so filtered queries fetch the
    /// owner's records and page in memory (per-user lists are small).
    pub async fn list_trips(
        &self,
        subject_id: &str,
        query: &TripListQuery,
    ) -> Result<Vec<TripRecord>, AppError> {
        let owner = subject_id.to_string();
        let saved_only = query.saved_only;

        let select = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TRIPS)
            .filter(move |q| {
                if saved_only {
                    q.for_all([
                        q.field("subject_id").eq(owner.clone()),
                        q.field("is_saved").eq(true),
                    ])
                } else {
                    q.for_all([q.field("subject_id").eq(owner.clone())])
                }
            })
            .order_by([(
                "searched_at",
                firestore::FirestoreQueryDirection::Descending,
            )]);

        if let Some(needle) = &query.destination {
            // In-memory filter + pagination
            let trips: Vec<TripRecord> = select.obj().query().await.map_err(db_error)?;

            let needle = needle.to_lowercase();
            let filtered: Vec<TripRecord> = trips
                .into_iter()
                .filter(|t| t.destination.to_lowercase().contains(&needle))
                .skip(query.skip as usize)
                .take(query.limit as usize)
                .collect();

            return Ok(filtered);
        }

        select
            .limit(query.limit)
            .offset(query.skip)
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    // ─── User Data Deletion ──────────────────────────────────────

    /// Delete a user and all of their trip records.
    ///
    /// Returns the number of trip records deleted. Identity-provider
    /// deletion is the caller's responsibility and happens first, so a
    /// failure there leaves the local data intact and surfaced.
    pub async fn delete_user_data(&self, subject_id: &str) -> Result<usize, AppError> {
        let owner = subject_id.to_string();
        let trips: Vec<TripRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TRIPS)
            .filter(move |q| q.for_all([q.field("subject_id").eq(owner.clone())]))
            .obj()
            .query()
            .await
            .map_err(db_error)?;

        let client = self.get_client()?;
        let trip_count = trips.len();

        stream::iter(trips)
            .map(|trip| async move {
                client
                    .fluent()
                    .delete()
                    .from(collections::TRIPS)
                    .document_id(&trip.id)
                    .execute()
                    .await
                    .map_err(db_error)?;
                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        tracing::debug!(subject_id, count = trip_count, "Deleted trip records");

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(subject_id)
            .execute()
            .await
            .map_err(db_error)?;

        tracing::info!(subject_id, trips = trip_count, "User data deletion complete");

        Ok(trip_count)
    }
}
