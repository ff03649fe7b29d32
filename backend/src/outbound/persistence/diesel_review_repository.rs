//! PostgreSQL-backed `ReviewRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ReviewRepository, StoreError};
use crate::domain::{PlacemarkId, Review, ReviewId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::ReviewRow;
use super::pool::DbPool;
use super::schema::reviews;

#[derive(Clone)]
pub struct DieselReviewRepository {
    pool: DbPool,
}

impl DieselReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for DieselReviewRepository {
    async fn find(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = reviews::table
            .find(*id.as_uuid())
            .select(ReviewRow::as_select())
            .first::<ReviewRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(ReviewRow::into_domain).transpose()
    }

    async fn list_for_placemark(
        &self,
        placemark_id: PlacemarkId,
    ) -> Result<Vec<Review>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        reviews::table
            .filter(reviews::placemark_id.eq(*placemark_id.as_uuid()))
            .order(reviews::created_at.asc())
            .select(ReviewRow::as_select())
            .load::<ReviewRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .into_iter()
            .map(ReviewRow::into_domain)
            .collect()
    }

    async fn insert(&self, review: &Review) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(reviews::table)
            .values(ReviewRow::from(review))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, StoreError> {
        // Replies reference their parent with ON DELETE CASCADE.
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(reviews::table.find(*id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
