//! Atomic credential mutations.
//!
//! Each method is one all-or-nothing unit: adapters run it inside a single
//! store transaction and roll back on any failure, so no caller can observe
//! a half-applied rotation, reset or password change.

use async_trait::async_trait;

use crate::domain::{
    ConsumeOutcome, Email, PasswordHash, RefreshTokenRecord, RotationOutcome, UserId,
};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialUnitOfWork: Send + Sync {
    /// Revoke `presented` and insert `replacement`.
    ///
    /// The revoke is conditional on the row still being unrevoked; when it
    /// matches nothing the replacement is not stored and
    /// [`RotationOutcome::Stale`] is returned. Of two concurrent calls with
    /// the same `presented` token at most one observes `Rotated`.
    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, StoreError>;

    /// Store a new password hash and delete every refresh token of the user.
    async fn replace_password(
        &self,
        user_id: UserId,
        hash: &PasswordHash,
    ) -> Result<(), StoreError>;

    /// Consume the reset token, store the new hash and delete every refresh
    /// token of the user.
    ///
    /// The token delete is conditional; if it removes nothing the transaction
    /// is rolled back and [`ConsumeOutcome::AlreadyConsumed`] is returned.
    async fn reset_password(
        &self,
        reset_token: &str,
        user_id: UserId,
        hash: &PasswordHash,
    ) -> Result<ConsumeOutcome, StoreError>;

    /// Consume the email-change token and switch the account's email.
    ///
    /// Fails with [`StoreError::Conflict`] if the address was claimed in the
    /// meantime.
    async fn change_email(
        &self,
        change_token: &str,
        user_id: UserId,
        new_email: &Email,
    ) -> Result<ConsumeOutcome, StoreError>;
}
