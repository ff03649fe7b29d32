//! Port for review persistence.

use async_trait::async_trait;

use crate::domain::{PlacemarkId, Review, ReviewId};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn find(&self, id: ReviewId) -> Result<Option<Review>, StoreError>;

    /// Every review and reply on the placemark.
    async fn list_for_placemark(&self, placemark_id: PlacemarkId)
    -> Result<Vec<Review>, StoreError>;

    async fn insert(&self, review: &Review) -> Result<(), StoreError>;

    /// Delete the review together with its replies.
    async fn delete(&self, id: ReviewId) -> Result<bool, StoreError>;
}
