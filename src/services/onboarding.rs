//! Onboarding status persistence (`user_metadata`).
//!
//! The table is owned by the backend-as-a-service; this module only reads
//! the completion flag and upserts it once the wizard finishes.

use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OnboardingStoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Persisted per-user metadata relevant to onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserMetadata {
    /// `None` when the column is `NULL`.
    pub onboarding_completed: Option<bool>,
}

#[async_trait::async_trait]
pub trait OnboardingStore: Send + Sync {
    /// Fetch the metadata row for a user, `None` when no row exists.
    async fn user_metadata(&self, user_id: Uuid) -> Result<Option<UserMetadata>, OnboardingStoreError>;

    /// Record that the user finished (or skipped) onboarding.
    async fn mark_completed(&self, user_id: Uuid) -> Result<(), OnboardingStoreError>;
}

/// Decide whether a user still needs onboarding from a metadata lookup.
///
/// A failed lookup or a missing row means onboarding is required. An
/// explicit `false` means onboarding is required. `true` or `NULL` means it
/// is not.
#[must_use]
pub fn needs_onboarding(lookup: &Result<Option<UserMetadata>, OnboardingStoreError>) -> bool {
    match lookup {
        Err(_) | Ok(None) => true,
        Ok(Some(meta)) => meta.onboarding_completed == Some(false),
    }
}

/// Load the onboarding flag for a user, logging lookup failures.
pub async fn is_onboarding(store: &dyn OnboardingStore, user_id: Uuid) -> bool {
    let lookup = store.user_metadata(user_id).await;
    if let Err(e) = &lookup {
        tracing::error!(%user_id, error = %e, "onboarding status lookup failed");
    }
    needs_onboarding(&lookup)
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgOnboardingStore {
    pool: PgPool,
}

impl PgOnboardingStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OnboardingStore for PgOnboardingStore {
    async fn user_metadata(&self, user_id: Uuid) -> Result<Option<UserMetadata>, OnboardingStoreError> {
        let row = sqlx::query("SELECT onboarding_completed FROM user_metadata WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| UserMetadata { onboarding_completed: r.get("onboarding_completed") }))
    }

    async fn mark_completed(&self, user_id: Uuid) -> Result<(), OnboardingStoreError> {
        sqlx::query(
            r"INSERT INTO user_metadata (user_id, onboarding_completed)
              VALUES ($1, true)
              ON CONFLICT (user_id) DO UPDATE SET onboarding_completed = true",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "onboarding_test.rs"]
mod tests;
