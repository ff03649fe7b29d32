//! PostgreSQL adapters for refresh-token and one-time-token rows, plus the
//! transactional credential unit of work.
//!
//! Every unit-of-work method opens one transaction. Single-use guarantees come
//! from conditional statements (`UPDATE .. WHERE revoked = false`,
//! `DELETE .. WHERE token = ?`) whose affected-row count decides the outcome,
//! so two racing requests cannot both succeed.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    CredentialUnitOfWork, OneTimeTokenRepository, RefreshTokenRepository, StoreError,
};
use crate::domain::{
    ConsumeOutcome, Email, OneTimePurpose, OneTimeToken, PasswordHash, RefreshTokenRecord,
    RotationOutcome, UserId,
};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{OneTimeTokenRow, RefreshTokenRow};
use super::pool::DbPool;
use super::schema::{one_time_tokens, refresh_tokens, users};

/// Diesel-backed refresh-token store.
#[derive(Clone)]
pub struct DieselRefreshTokenRepository {
    pool: DbPool,
}

impl DieselRefreshTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for DieselRefreshTokenRepository {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(refresh_tokens::table)
            .values(RefreshTokenRow::from(record))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = refresh_tokens::table
            .find(token)
            .select(RefreshTokenRow::as_select())
            .first::<RefreshTokenRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn find_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = refresh_tokens::table
            .filter(refresh_tokens::jti.eq(jti))
            .select(RefreshTokenRow::as_select())
            .first::<RefreshTokenRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn revoke(&self, token: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(refresh_tokens::table.find(token))
            .set(refresh_tokens::revoked.eq(true))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }
}

/// Diesel-backed one-time-token store.
#[derive(Clone)]
pub struct DieselOneTimeTokenRepository {
    pool: DbPool,
}

impl DieselOneTimeTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OneTimeTokenRepository for DieselOneTimeTokenRepository {
    async fn insert(&self, token: &OneTimeToken) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(one_time_tokens::table)
            .values(OneTimeTokenRow::from(token))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find(
        &self,
        token: &str,
        purpose: OneTimePurpose,
    ) -> Result<Option<OneTimeToken>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = one_time_tokens::table
            .find(token)
            .filter(one_time_tokens::purpose.eq(purpose.as_str()))
            .select(OneTimeTokenRow::as_select())
            .first::<OneTimeTokenRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(OneTimeTokenRow::into_domain).transpose()
    }
}

/// Transactional credential mutations.
#[derive(Clone)]
pub struct DieselCredentialUnitOfWork {
    pool: DbPool,
}

impl DieselCredentialUnitOfWork {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn consume_one_time(
    conn: &mut AsyncPgConnection,
    token: &str,
    user: Uuid,
    purpose: OneTimePurpose,
) -> QueryResult<bool> {
    let deleted = diesel::delete(
        one_time_tokens::table
            .find(token)
            .filter(one_time_tokens::user_id.eq(user))
            .filter(one_time_tokens::purpose.eq(purpose.as_str())),
    )
    .execute(conn)
    .await?;
    Ok(deleted == 1)
}

async fn clear_refresh_tokens(conn: &mut AsyncPgConnection, user: Uuid) -> QueryResult<usize> {
    diesel::delete(refresh_tokens::table.filter(refresh_tokens::user_id.eq(user)))
        .execute(conn)
        .await
}

#[async_trait]
impl CredentialUnitOfWork for DieselCredentialUnitOfWork {
    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, StoreError> {
        let row = RefreshTokenRow::from(replacement);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let revoked = diesel::update(
                    refresh_tokens::table
                        .find(presented)
                        .filter(refresh_tokens::revoked.eq(false)),
                )
                .set(refresh_tokens::revoked.eq(true))
                .execute(conn)
                .await?;
                if revoked == 0 {
                    return Ok(RotationOutcome::Stale);
                }
                diesel::insert_into(refresh_tokens::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok(RotationOutcome::Rotated)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn replace_password(
        &self,
        user_id: UserId,
        hash: &PasswordHash,
    ) -> Result<(), StoreError> {
        let user = *user_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::update(users::table.find(user))
                    .set((
                        users::password_hash.eq(hash.as_str()),
                        users::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;
                let cleared = clear_refresh_tokens(conn, user).await?;
                debug!(user_id = %user, cleared, "password replaced");
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn reset_password(
        &self,
        reset_token: &str,
        user_id: UserId,
        hash: &PasswordHash,
    ) -> Result<ConsumeOutcome, StoreError> {
        let user = *user_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                if !consume_one_time(conn, reset_token, user, OneTimePurpose::PasswordReset)
                    .await?
                {
                    return Ok(ConsumeOutcome::AlreadyConsumed);
                }
                diesel::update(users::table.find(user))
                    .set((
                        users::password_hash.eq(hash.as_str()),
                        users::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;
                clear_refresh_tokens(conn, user).await?;
                Ok(ConsumeOutcome::Applied)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn change_email(
        &self,
        change_token: &str,
        user_id: UserId,
        new_email: &Email,
    ) -> Result<ConsumeOutcome, StoreError> {
        let user = *user_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                if !consume_one_time(conn, change_token, user, OneTimePurpose::EmailChange)
                    .await?
                {
                    return Ok(ConsumeOutcome::AlreadyConsumed);
                }
                diesel::update(users::table.find(user))
                    .set((
                        users::email.eq(new_email.as_ref()),
                        users::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;
                Ok(ConsumeOutcome::Applied)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}
