// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Exercises (shared library)
//! - Plans (legacy standalone collection)
//! - Users (canonical owner of embedded plans/history/records/searchHistory)
//!
//! The client is constructed once at startup and injected through `AppState`;
//! nothing here is lazily initialized. Every user read-modify-write runs inside
//! a Firestore transaction so a conflicting concurrent commit fails the call
//! instead of silently losing the update.

use crate::db::collections;
use crate::error::AppError;
use crate::models::plan::PublicType;
use crate::models::{
    Exercise, HistoryItem, Plan, RecordItem, SearchHistoryItem, User, UserSearchResult,
    UserSummary, VisibilityUpdate,
};
use uuid::Uuid;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
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

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Exercise Library ────────────────────────────────────────

    /// List the whole exercise library.
    pub async fn list_exercises(&self) -> Result<Vec<Exercise>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EXERCISES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Library entries belonging to one published version.
    pub async fn get_exercises_by_version(
        &self,
        version: &str,
    ) -> Result<Vec<Exercise>, AppError> {
        let version = version.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EXERCISES)
            .filter(move |q| q.for_all([q.field("version").eq(version.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a library entry under a fresh server id.
    pub async fn create_exercise(&self, mut exercise: Exercise) -> Result<Exercise, AppError> {
        exercise.id = Uuid::new_v4().to_string();
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::EXERCISES)
            .document_id(&exercise.id)
            .object(&exercise)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(exercise)
    }

    /// Full overwrite of an existing library entry.
    pub async fn replace_exercise(
        &self,
        exercise_id: &str,
        mut exercise: Exercise,
    ) -> Result<Exercise, AppError> {
        if !exercise.id.is_empty() && exercise.id != exercise_id {
            return Err(AppError::BadRequest(
                "Exercise id does not match request path".to_string(),
            ));
        }
        self.require_exists::<Exercise>(collections::EXERCISES, exercise_id, "Exercise not found")
            .await?;

        exercise.id = exercise_id.to_string();
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::EXERCISES)
            .document_id(exercise_id)
            .object(&exercise)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(exercise)
    }

    /// Delete a library entry; deleting an absent id is an error.
    pub async fn delete_exercise(&self, exercise_id: &str) -> Result<(), AppError> {
        self.require_exists::<Exercise>(collections::EXERCISES, exercise_id, "Exercise not found")
            .await?;
        self.delete_doc(collections::EXERCISES, exercise_id).await
    }

    // ─── Plans (legacy standalone collection) ────────────────────

    pub async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PLANS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Standalone plans created by one user.
    pub async fn get_plans_by_author(&self, author_id: &str) -> Result<Vec<Plan>, AppError> {
        let author_id = author_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PLANS)
            .filter(move |q| q.for_all([q.field("authorId").eq(author_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a standalone plan owned by `author_id` under a fresh server id.
    pub async fn create_plan(&self, mut plan: Plan, author_id: &str) -> Result<Plan, AppError> {
        plan.id = Uuid::new_v4().to_string();
        plan.author_id = Some(author_id.to_string());
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLANS)
            .document_id(&plan.id)
            .object(&plan)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(plan)
    }

    /// Full overwrite of an existing standalone plan.
    pub async fn replace_plan(&self, plan_id: &str, plan: Plan) -> Result<Plan, AppError> {
        self.require_exists::<Plan>(collections::PLANS, plan_id, "Plan not found")
            .await?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLANS)
            .document_id(plan_id)
            .object(&plan)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(plan)
    }

    /// Delete a standalone plan; deleting an absent id is an error.
    pub async fn delete_plan(&self, plan_id: &str) -> Result<(), AppError> {
        self.require_exists::<Plan>(collections::PLANS, plan_id, "Plan not found")
            .await?;
        self.delete_doc(collections::PLANS, plan_id).await
    }

    // ─── User Lookups ────────────────────────────────────────────

    /// Sanitized listing of every user.
    pub async fn list_user_summaries(&self) -> Result<Vec<UserSummary>, AppError> {
        let users = self.list_users().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user or fail with the canonical `User not found` error.
    pub async fn get_user_required(&self, user_id: &str) -> Result<User, AppError> {
        self.get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.get_user_by_field("email", email).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.get_user_by_field("username", username).await
    }

    async fn get_user_by_field(&self, field: &str, value: &str) -> Result<Option<User>, AppError> {
        let field = field.to_string();
        let value = value.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field(field.clone()).eq(value.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.pop())
    }

    /// Case-insensitive username search, excluding the requester.
    ///
    /// Firestore has no substring operator, so the filtering happens here over
    /// the user collection; the original's store-side LIKE was a pre-filter
    /// only, never a correctness dependency.
    pub async fn search_users_by_username(
        &self,
        query: &str,
        max_results: usize,
        exclude_user_id: &str,
    ) -> Result<Vec<UserSearchResult>, AppError> {
        let users = self.list_users().await?;
        Ok(crate::models::user::search_by_username(
            &users,
            query,
            max_results,
            exclude_user_id,
        ))
    }

    // ─── User Registration ───────────────────────────────────────

    /// Insert a new user after checking both uniqueness constraints.
    ///
    /// Firestore offers no unique index, so this is query-then-write; the
    /// residual race window against concurrent registrations is accepted and
    /// documented in DESIGN.md.
    pub async fn register_user(&self, user: User) -> Result<User, AppError> {
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict(
                "User already exists with that email".to_string(),
            ));
        }
        if self.get_user_by_username(&user.username).await?.is_some() {
            return Err(AppError::Conflict(
                "User already exists with that username".to_string(),
            ));
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    // ─── User Aggregate Mutations ────────────────────────────────
    //
    // Each operation loads the user inside a transaction, applies one of the
    // pure mutations from `models::user`, and writes the document back in the
    // same transaction.

    /// Run a read-modify-write of one user document inside a transaction.
    ///
    /// `mutate` errors abort the call before any write; the transaction is
    /// rolled back and the error propagates unchanged (this is how `Plan not
    /// found` and friends surface).
    async fn update_user_txn<R, F>(&self, user_id: &str, mutate: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut User) -> Result<R, AppError>,
    {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Read the current document; registers it for conflict detection.
        let user: Option<User> = client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read user in transaction: {}", e)))?;

        let Some(mut user) = user else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound("User not found".to_string()));
        };

        let outcome = match mutate(&mut user) {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(outcome)
    }

    /// Add a plan to the user's embedded plans (upsert by id).
    pub async fn add_plan_to_user(&self, user_id: &str, plan: Plan) -> Result<Plan, AppError> {
        let plan = self
            .update_user_txn(user_id, |user| Ok(user.upsert_plan(plan)))
            .await?;
        tracing::debug!(user_id, plan_id = %plan.id, "Plan added to user");
        Ok(plan)
    }

    /// Replace an embedded plan by id.
    pub async fn edit_user_plan(&self, user_id: &str, updated: Plan) -> Result<Plan, AppError> {
        self.update_user_txn(user_id, |user| {
            user.replace_plan(updated)
                .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))
        })
        .await
    }

    /// Remove an embedded plan by id; returns the removed plan.
    pub async fn remove_plan_from_user(
        &self,
        user_id: &str,
        plan_id: &str,
    ) -> Result<Plan, AppError> {
        self.update_user_txn(user_id, |user| {
            user.remove_plan(plan_id)
                .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))
        })
        .await
    }

    /// Prepend a history item under a fresh server id.
    pub async fn add_history_item_to_user(
        &self,
        user_id: &str,
        item: HistoryItem,
    ) -> Result<HistoryItem, AppError> {
        self.update_user_txn(user_id, |user| Ok(user.push_history_item(item)))
            .await
    }

    /// Overwrite visibility on matched embedded plans; returns the public subset.
    pub async fn set_plans_public_status(
        &self,
        user_id: &str,
        updates: Vec<VisibilityUpdate>,
    ) -> Result<Vec<Plan>, AppError> {
        self.update_user_txn(user_id, |user| Ok(user.set_plans_public_status(&updates)))
            .await
    }

    /// Overwrite visibility on matched history items; optionally updates the
    /// user's default history visibility in the same write.
    pub async fn set_history_public_status(
        &self,
        user_id: &str,
        updates: Vec<VisibilityUpdate>,
        default_public_type: Option<PublicType>,
    ) -> Result<Vec<HistoryItem>, AppError> {
        self.update_user_txn(user_id, |user| {
            if let Some(default) = default_public_type {
                user.default_history_public_type = default;
            }
            Ok(user.set_history_public_status(&updates))
        })
        .await
    }

    /// Record a searched-for user (de-duplicated by target, capped).
    pub async fn add_search_history_item_to_user(
        &self,
        user_id: &str,
        item: SearchHistoryItem,
    ) -> Result<SearchHistoryItem, AppError> {
        self.update_user_txn(user_id, |user| Ok(user.upsert_search_entry(item)))
            .await
    }

    pub async fn remove_search_history_item_from_user(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<(), AppError> {
        self.update_user_txn(user_id, |user| {
            user.remove_search_entry(item_id);
            Ok(())
        })
        .await
    }

    pub async fn clear_search_history_for_user(&self, user_id: &str) -> Result<(), AppError> {
        self.update_user_txn(user_id, |user| {
            user.clear_search_history();
            Ok(())
        })
        .await
    }

    /// Rename a user after re-checking global uniqueness.
    pub async fn update_user_username(
        &self,
        user_id: &str,
        new_username: &str,
    ) -> Result<String, AppError> {
        if let Some(existing) = self.get_user_by_username(new_username).await? {
            if existing.id != user_id {
                return Err(AppError::Conflict("Username is already taken".to_string()));
            }
        }

        let new_username = new_username.to_string();
        self.update_user_txn(user_id, move |user| {
            user.username = new_username.clone();
            Ok(new_username)
        })
        .await
    }

    /// Replace the stored password hash.
    pub async fn update_user_password(
        &self,
        user_id: &str,
        new_password_hash: &str,
    ) -> Result<(), AppError> {
        let hash = new_password_hash.to_string();
        self.update_user_txn(user_id, move |user| {
            user.password = hash;
            Ok(())
        })
        .await
    }

    /// Persist the refresh token issued at login.
    pub async fn save_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<(), AppError> {
        let token = refresh_token.to_string();
        self.update_user_txn(user_id, move |user| {
            user.refresh_token = Some(token);
            Ok(())
        })
        .await
    }

    /// Replace the user's records array wholesale.
    pub async fn update_user_records(
        &self,
        user_id: &str,
        records: Vec<RecordItem>,
    ) -> Result<(), AppError> {
        self.update_user_txn(user_id, move |user| {
            user.records = records;
            Ok(())
        })
        .await
    }

    // ─── Public Views ────────────────────────────────────────────

    pub async fn get_public_plans(&self, user_id: &str) -> Result<Vec<Plan>, AppError> {
        Ok(self.get_user_required(user_id).await?.public_plans())
    }

    pub async fn get_public_records(&self, user_id: &str) -> Result<Vec<RecordItem>, AppError> {
        Ok(self.get_user_required(user_id).await?.public_records())
    }

    pub async fn get_public_history_items(
        &self,
        user_id: &str,
    ) -> Result<Vec<HistoryItem>, AppError> {
        Ok(self.get_user_required(user_id).await?.public_history_items())
    }

    // ─── Helpers ─────────────────────────────────────────────────

    /// Fail with `NotFound` when a document id is absent in a collection.
    ///
    /// Firestore deletes missing documents silently; the API contract treats a
    /// repeated delete (and a replace of a missing id) as an error, so
    /// existence is checked first.
    async fn require_exists<T>(
        &self,
        collection: &str,
        doc_id: &str,
        not_found: &str,
    ) -> Result<(), AppError>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        let existing: Option<T> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if existing.is_none() {
            return Err(AppError::NotFound(not_found.to_string()));
        }
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, doc_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
