//! Port for category persistence.

use async_trait::async_trait;

use crate::domain::{Category, CategoryId};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories ordered by name.
    async fn list(&self) -> Result<Vec<Category>, StoreError>;

    async fn find(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// Fails with [`StoreError::Conflict`] on a duplicate name.
    async fn insert(&self, category: &Category) -> Result<(), StoreError>;

    /// Number of placemarks filed under the category.
    async fn usage_count(&self, id: CategoryId) -> Result<u64, StoreError>;

    /// Returns `false` when no such category existed.
    async fn delete(&self, id: CategoryId) -> Result<bool, StoreError>;
}
