//! Port for placemark persistence.

use async_trait::async_trait;

use crate::domain::{Placemark, PlacemarkId};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlacemarkRepository: Send + Sync {
    /// All placemarks, newest first.
    async fn list(&self) -> Result<Vec<Placemark>, StoreError>;

    async fn find(&self, id: PlacemarkId) -> Result<Option<Placemark>, StoreError>;

    async fn insert(&self, placemark: &Placemark) -> Result<(), StoreError>;

    /// Overwrite the stored row with `placemark`.
    async fn update(&self, placemark: &Placemark) -> Result<(), StoreError>;

    /// Atomically add one view and return the row after the increment.
    async fn increment_views(&self, id: PlacemarkId) -> Result<Option<Placemark>, StoreError>;

    /// Delete the placemark after its reviews, replies first.
    async fn delete(&self, id: PlacemarkId) -> Result<bool, StoreError>;
}
