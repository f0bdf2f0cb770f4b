// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts) and their unique usernames/emails
//! - Activities (logged sessions)
//! - Goals
//! - Developers (API consumers) and their API keys

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Activity, ActivityType, Developer, Goal, UniqueClaim, User};
use crate::services::api_key::{generate_api_key, hash_api_key, MAX_KEY_ATTEMPTS};
use chrono::{NaiveDate, Utc};
use firestore::errors::FirestoreError;
use serde::{de::DeserializeOwned, Serialize};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Date window and type used to narrow activity queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityRange {
    /// Inclusive lower bound
    pub start: Option<NaiveDate>,
    /// Inclusive upper bound
    pub end: Option<NaiveDate>,
    pub activity_type: Option<ActivityType>,
}

/// Kinds of values reserved in the `unique_claims` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    Username,
    UserEmail,
    DeveloperEmail,
    ApiKey,
}

impl ClaimKind {
    fn prefix(&self) -> &'static str {
        match self {
            ClaimKind::Username => "username",
            ClaimKind::UserEmail => "user_email",
            ClaimKind::DeveloperEmail => "developer_email",
            ClaimKind::ApiKey => "api_key",
        }
    }

    /// Document ID for a claimed value.
    ///
    /// Values are hashed so arbitrary input is a valid document ID and raw
    /// API keys never appear in document paths. Emails compare case-insensitively.
    pub fn document_id(&self, value: &str) -> String {
        let normalized = match self {
            ClaimKind::UserEmail | ClaimKind::DeveloperEmail => value.trim().to_lowercase(),
            ClaimKind::Username | ClaimKind::ApiKey => value.to_string(),
        };
        format!("{}:{}", self.prefix(), hash_api_key(&normalized))
    }
}

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

    // ─── Generic Document Helpers ────────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or overwrite a document.
    async fn set_doc<T>(&self, collection: &str, id: &str, object: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: T = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Unique Claims ───────────────────────────────────────────

    /// Atomically reserve a unique value for `owner_id`.
    ///
    /// Returns `false` if the value is already held. The create fails on the
    /// server when the document exists, so two concurrent callers can never
    /// both succeed.
    pub async fn claim_unique(
        &self,
        kind: ClaimKind,
        value: &str,
        owner_id: &str,
    ) -> Result<bool, AppError> {
        let claim = UniqueClaim {
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
        };

        let result: Result<UniqueClaim, FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::UNIQUE_CLAIMS)
            .document_id(kind.document_id(value))
            .object(&claim)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => {
                tracing::debug!(kind = kind.prefix(), "Unique value already claimed");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Look up which record holds a unique value.
    pub async fn claim_owner(&self, kind: ClaimKind, value: &str) -> Result<Option<String>, AppError> {
        let claim: Option<UniqueClaim> = self
            .get_doc(collections::UNIQUE_CLAIMS, &kind.document_id(value))
            .await?;
        Ok(claim.map(|c| c.owner_id))
    }

    /// Release a unique value.
    pub async fn release_claim(&self, kind: ClaimKind, value: &str) -> Result<(), AppError> {
        self.delete_doc(collections::UNIQUE_CLAIMS, &kind.document_id(value))
            .await
    }

    /// Best-effort release used when unwinding a failed multi-step write.
    async fn release_claims_quietly(&self, claims: &[(ClaimKind, &str)]) {
        for (kind, value) in claims {
            if let Err(e) = self.release_claim(*kind, value).await {
                tracing::warn!(kind = kind.prefix(), error = %e, "Failed to release claim");
            }
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, user_id).await
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        match self.claim_owner(ClaimKind::Username, username).await? {
            Some(user_id) => self.get_user(&user_id).await,
            None => Ok(None),
        }
    }

    /// Create a new user, reserving username and email.
    ///
    /// Fails with a field-level validation error if either is taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        if !self
            .claim_unique(ClaimKind::Username, &user.username, &user.id)
            .await?
        {
            return Err(AppError::field(
                "username",
                "A user with that username already exists.",
            ));
        }

        if !self
            .claim_unique(ClaimKind::UserEmail, &user.email, &user.id)
            .await?
        {
            self.release_claims_quietly(&[(ClaimKind::Username, user.username.as_str())])
                .await;
            return Err(AppError::field(
                "email",
                "A user with that email already exists.",
            ));
        }

        if let Err(e) = self.set_doc(collections::USERS, &user.id, user).await {
            self.release_claims_quietly(&[
                (ClaimKind::Username, user.username.as_str()),
                (ClaimKind::UserEmail, user.email.as_str()),
            ])
            .await;
            return Err(e);
        }

        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    /// Store an updated user, moving the email claim if the email changed.
    pub async fn update_user(&self, previous_email: &str, user: &User) -> Result<(), AppError> {
        let email_changed = ClaimKind::UserEmail.document_id(previous_email)
            != ClaimKind::UserEmail.document_id(&user.email);

        if email_changed
            && !self
                .claim_unique(ClaimKind::UserEmail, &user.email, &user.id)
                .await?
        {
            return Err(AppError::field(
                "email",
                "A user with that email already exists.",
            ));
        }

        self.set_doc(collections::USERS, &user.id, user).await?;

        if email_changed {
            self.release_claims_quietly(&[(ClaimKind::UserEmail, previous_email)])
                .await;
        }
        Ok(())
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Get an activity by ID.
    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get_doc(collections::ACTIVITIES, activity_id).await
    }

    /// Get a user's activities within a date window and optional type.
    ///
    /// Ordering is left to the caller.
    pub async fn get_activities_for_user(
        &self,
        user_id: &str,
        range: ActivityRange,
    ) -> Result<Vec<Activity>, AppError> {
        let user_id = user_id.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.as_str()),
                    range
                        .start
                        .and_then(|d| q.field("date").greater_than_or_equal(d.to_string())),
                    range
                        .end
                        .and_then(|d| q.field("date").less_than_or_equal(d.to_string())),
                    range
                        .activity_type
                        .and_then(|t| q.field("activity_type").eq(t.as_str())),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace an activity.
    pub async fn set_activity(&self, activity: &Activity) -> Result<(), AppError> {
        self.set_doc(collections::ACTIVITIES, &activity.id, activity)
            .await
    }

    /// Delete an activity.
    pub async fn delete_activity(&self, activity_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::ACTIVITIES, activity_id).await
    }

    // ─── Goal Operations ─────────────────────────────────────────

    /// Get a goal by ID.
    pub async fn get_goal(&self, goal_id: &str) -> Result<Option<Goal>, AppError> {
        self.get_doc(collections::GOALS, goal_id).await
    }

    /// Get all goals for a user.
    pub async fn get_goals_for_user(&self, user_id: &str) -> Result<Vec<Goal>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::GOALS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a goal.
    pub async fn set_goal(&self, goal: &Goal) -> Result<(), AppError> {
        self.set_doc(collections::GOALS, &goal.id, goal).await
    }

    /// Delete a goal.
    pub async fn delete_goal(&self, goal_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::GOALS, goal_id).await
    }

    // ─── Developer Operations ────────────────────────────────────

    /// Get a developer by ID.
    pub async fn get_developer(&self, developer_id: &str) -> Result<Option<Developer>, AppError> {
        self.get_doc(collections::DEVELOPERS, developer_id).await
    }

    /// Resolve an API key to an active developer.
    pub async fn get_active_developer_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<Developer>, AppError> {
        let Some(developer_id) = self.claim_owner(ClaimKind::ApiKey, api_key).await? else {
            return Ok(None);
        };

        let developer = self.get_developer(&developer_id).await?;
        Ok(developer.filter(|d| d.is_active && d.api_key == api_key))
    }

    /// Generate an API key not held by anyone else and reserve it.
    async fn claim_new_api_key(&self, developer_id: &str) -> Result<String, AppError> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let api_key = generate_api_key();
            if self
                .claim_unique(ClaimKind::ApiKey, &api_key, developer_id)
                .await?
            {
                return Ok(api_key);
            }
            tracing::warn!(developer_id, attempt, "Generated API key collided, retrying");
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "Could not generate a unique API key after {} attempts",
            MAX_KEY_ATTEMPTS
        )))
    }

    /// Register a developer, reserving the email and issuing an API key.
    ///
    /// The `api_key` field of the passed developer is ignored; the stored
    /// record (with its new key) is returned.
    pub async fn create_developer(&self, developer: &Developer) -> Result<Developer, AppError> {
        if !self
            .claim_unique(ClaimKind::DeveloperEmail, &developer.email, &developer.id)
            .await?
        {
            return Err(AppError::field(
                "email",
                "A developer account with this email already exists.",
            ));
        }

        let api_key = match self.claim_new_api_key(&developer.id).await {
            Ok(key) => key,
            Err(e) => {
                self.release_claims_quietly(&[(ClaimKind::DeveloperEmail, developer.email.as_str())])
                    .await;
                return Err(e);
            }
        };

        let developer = Developer {
            api_key,
            ..developer.clone()
        };

        if let Err(e) = self
            .set_doc(collections::DEVELOPERS, &developer.id, &developer)
            .await
        {
            self.release_claims_quietly(&[
                (ClaimKind::DeveloperEmail, developer.email.as_str()),
                (ClaimKind::ApiKey, developer.api_key.as_str()),
            ])
            .await;
            return Err(e);
        }

        tracing::info!(developer_id = %developer.id, "Developer registered");
        Ok(developer)
    }

    /// Replace a developer's API key. The old key stops working as soon as
    /// the transaction commits.
    pub async fn regenerate_api_key(&self, developer: &Developer) -> Result<Developer, AppError> {
        let new_key = self.claim_new_api_key(&developer.id).await?;

        let updated = Developer {
            api_key: new_key,
            updated_at: Utc::now(),
            ..developer.clone()
        };

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::DEVELOPERS)
            .document_id(&updated.id)
            .object(&updated)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add developer to transaction: {}", e))
            })?;

        client
            .fluent()
            .delete()
            .from(collections::UNIQUE_CLAIMS)
            .document_id(ClaimKind::ApiKey.document_id(&developer.api_key))
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add key removal to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            self.release_claims_quietly(&[(ClaimKind::ApiKey, updated.api_key.as_str())])
                .await;
            return Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            )));
        }

        tracing::info!(developer_id = %updated.id, "API key regenerated");
        Ok(updated)
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    // ─── Account Deletion ─────────────────────────────────────────

    /// Delete a user and everything they own.
    ///
    /// Deletes, in order:
    /// - `goals` (query by user_id)
    /// - `activities` (query by user_id)
    /// - username and email claims
    /// - `users/{user_id}`
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user: &User) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // 1. Goals
        let goals = self.get_goals_for_user(&user.id).await?;
        let count = goals.len();
        self.batch_delete(&goals, collections::GOALS, |goal: &Goal| goal.id.clone())
            .await?;
        deleted_count += count;
        tracing::debug!(user_id = %user.id, count, "Deleted goals");

        // 2. Activities
        let activities = self
            .get_activities_for_user(&user.id, ActivityRange::default())
            .await?;
        let count = activities.len();
        self.batch_delete(&activities, collections::ACTIVITIES, |a: &Activity| {
            a.id.clone()
        })
        .await?;
        deleted_count += count;
        tracing::debug!(user_id = %user.id, count, "Deleted activities");

        // 3. Claims, then the profile itself
        self.release_claim(ClaimKind::Username, user.username.as_str())
            .await?;
        self.release_claim(ClaimKind::UserEmail, user.email.as_str())
            .await?;
        deleted_count += 2;

        self.delete_doc(collections::USERS, &user.id).await?;
        deleted_count += 1;

        tracing::info!(user_id = %user.id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}
