//! Port abstraction for user account persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Profile, Role, User, UserId};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account with its profile and optional OAuth link.
    ///
    /// Fails with [`StoreError::Conflict`] when the email is already taken.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Look up by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_oauth(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<User>, StoreError>;

    /// All accounts, oldest first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Replace the profile; returns the updated account if it exists.
    async fn update_profile(
        &self,
        id: UserId,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Stamp the verification time; returns `false` if the account is gone.
    async fn mark_verified(&self, id: UserId, at: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn set_role(
        &self,
        id: UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Delete the account and everything it owns in one transaction.
    ///
    /// Removes the profile, OAuth link, refresh and one-time tokens, the
    /// user's placemarks with their reviews, and the user's own reviews;
    /// clears the creator of categories the user created. Returns `false`
    /// when no such account existed.
    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;
}
