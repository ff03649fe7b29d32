//! Port for single-use token rows (password reset, email change).

use async_trait::async_trait;

use crate::domain::{OneTimePurpose, OneTimeToken};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OneTimeTokenRepository: Send + Sync {
    async fn insert(&self, token: &OneTimeToken) -> Result<(), StoreError>;

    async fn find(
        &self,
        token: &str,
        purpose: OneTimePurpose,
    ) -> Result<Option<OneTimeToken>, StoreError>;
}
