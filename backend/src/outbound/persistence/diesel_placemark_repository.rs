//! PostgreSQL-backed `PlacemarkRepository`.
//!
//! View counting is a single `UPDATE .. SET view_count = view_count + 1
//! RETURNING *` so concurrent readers never lose increments, and plain updates
//! leave `view_count` untouched for the same reason.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PlacemarkRepository, StoreError};
use crate::domain::{Placemark, PlacemarkId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::PlacemarkRow;
use super::pool::DbPool;
use super::schema::placemarks;

#[derive(Clone)]
pub struct DieselPlacemarkRepository {
    pool: DbPool,
}

impl DieselPlacemarkRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlacemarkRepository for DieselPlacemarkRepository {
    async fn list(&self) -> Result<Vec<Placemark>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = placemarks::table
            .order(placemarks::created_at.desc())
            .select(PlacemarkRow::as_select())
            .load::<PlacemarkRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(Placemark::from).collect())
    }

    async fn find(&self, id: PlacemarkId) -> Result<Option<Placemark>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = placemarks::table
            .find(*id.as_uuid())
            .select(PlacemarkRow::as_select())
            .first::<PlacemarkRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Placemark::from))
    }

    async fn insert(&self, placemark: &Placemark) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(placemarks::table)
            .values(PlacemarkRow::from(placemark))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn update(&self, placemark: &Placemark) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = PlacemarkRow::from(placemark);
        diesel::update(placemarks::table.find(row.id))
            .set((
                placemarks::name.eq(&row.name),
                placemarks::description.eq(&row.description),
                placemarks::street.eq(&row.street),
                placemarks::house_number.eq(&row.house_number),
                placemarks::zip.eq(&row.zip),
                placemarks::city.eq(&row.city),
                placemarks::country.eq(&row.country),
                placemarks::latitude.eq(row.latitude),
                placemarks::longitude.eq(row.longitude),
                placemarks::image_url.eq(&row.image_url),
                placemarks::is_public.eq(row.is_public),
                placemarks::category_id.eq(row.category_id),
                placemarks::updated_at.eq(row.updated_at),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn increment_views(&self, id: PlacemarkId) -> Result<Option<Placemark>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = diesel::update(placemarks::table.find(*id.as_uuid()))
            .set(placemarks::view_count.eq(placemarks::view_count + 1_i64))
            .returning(PlacemarkRow::as_returning())
            .get_result::<PlacemarkRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Placemark::from))
    }

    async fn delete(&self, id: PlacemarkId) -> Result<bool, StoreError> {
        // Reviews and their replies go with the row through ON DELETE CASCADE.
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(placemarks::table.find(*id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
