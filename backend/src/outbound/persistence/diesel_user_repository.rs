//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{StoreError, UserRepository};
use crate::domain::{Profile, Role, User, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewUserRow, ProfileUpdate, UserRow};
use super::pool::DbPool;
use super::schema::{placemarks, reviews, users};

/// Diesel-backed implementation of the user repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_user(row: Option<UserRow>) -> Result<Option<User>, StoreError> {
    row.map(UserRow::into_domain).transpose()
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(NewUserRow::from(user))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .find(*id.as_uuid())
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        into_user(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        into_user(row)
    }

    async fn find_by_oauth(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .filter(users::oauth_provider.eq(provider))
            .filter(users::oauth_subject.eq(subject))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        into_user(row)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .order(users::created_at.asc())
            .select(UserRow::as_select())
            .load::<UserRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .into_iter()
            .map(UserRow::into_domain)
            .collect()
    }

    async fn update_profile(
        &self,
        id: UserId,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = ProfileUpdate {
            first_name: &profile.first_name,
            last_name: &profile.last_name,
            contact_email: profile.contact_email.as_deref(),
            contact_phone: profile.contact_phone.as_deref(),
            updated_at: now,
        };
        let row = diesel::update(users::table.find(*id.as_uuid()))
            .set(&changes)
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        into_user(row)
    }

    async fn mark_verified(&self, id: UserId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.find(*id.as_uuid()))
            .set((users::email_verified_at.eq(at), users::updated_at.eq(at)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn set_role(
        &self,
        id: UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = diesel::update(users::table.find(*id.as_uuid()))
            .set((users::role.eq(role.as_str()), users::updated_at.eq(now)))
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        into_user(row)
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let uuid: Uuid = *id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // Token rows, replies and category authorship follow through the
        // foreign keys; reviews and placemarks go first so the order is fixed.
        let removed = conn
            .transaction(|conn| {
                async move {
                    let owned = placemarks::table
                        .filter(placemarks::owner_id.eq(uuid))
                        .select(placemarks::id);
                    let on_owned = diesel::delete(
                        reviews::table.filter(reviews::placemark_id.eq_any(owned)),
                    )
                    .execute(conn)
                    .await?;
                    let authored =
                        diesel::delete(reviews::table.filter(reviews::author_id.eq(uuid)))
                            .execute(conn)
                            .await?;
                    let spots =
                        diesel::delete(placemarks::table.filter(placemarks::owner_id.eq(uuid)))
                            .execute(conn)
                            .await?;
                    debug!(user_id = %uuid, on_owned, authored, spots, "removing account content");
                    diesel::delete(users::table.find(uuid)).execute(conn).await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }
}
