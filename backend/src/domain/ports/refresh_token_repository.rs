//! Port for refresh-token rows.

use async_trait::async_trait;

use crate::domain::RefreshTokenRecord;

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Row paired with the access token carrying `jti`.
    async fn find_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Mark the row revoked; returns `false` when no row matched.
    async fn revoke(&self, token: &str) -> Result<bool, StoreError>;
}
