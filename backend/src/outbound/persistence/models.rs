//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Each read row converts into its domain
//! entity; conversion failures surface as `StoreError::Query`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::StoreError;
use crate::domain::{
    Address, Category, CategoryId, Coordinates, Email, OAuthLink, OneTimePurpose, OneTimeToken,
    PasswordHash, Placemark, PlacemarkId, Profile, RefreshTokenRecord, Review, ReviewId, Role,
    User, UserId,
};

use super::schema::{categories, one_time_tokens, placemarks, refresh_tokens, reviews, users};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub first_name: String,
    pub last_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub oauth_provider: Option<String>,
    pub oauth_subject: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_domain(self) -> Result<User, StoreError> {
        let email = Email::parse(&self.email)
            .map_err(|err| StoreError::query(format!("stored email for {}: {err}", self.id)))?;
        let role: Role = self
            .role
            .parse()
            .map_err(|err| StoreError::query(format!("stored role for {}: {err}", self.id)))?;
        let oauth = match (self.oauth_provider, self.oauth_subject) {
            (Some(provider), Some(subject)) => Some(OAuthLink { provider, subject }),
            _ => None,
        };
        Ok(User {
            id: UserId::from_uuid(self.id),
            email,
            password_hash: self.password_hash.map(PasswordHash::new),
            role,
            email_verified_at: self.email_verified_at,
            profile: Profile {
                first_name: self.first_name,
                last_name: self.last_name,
                contact_email: self.contact_email,
                contact_phone: self.contact_phone,
            },
            oauth,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub role: &'a str,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub contact_email: Option<&'a str>,
    pub contact_phone: Option<&'a str>,
    pub oauth_provider: Option<&'a str>,
    pub oauth_subject: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a User> for NewUserRow<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            email: user.email.as_ref(),
            password_hash: user.password_hash.as_ref().map(PasswordHash::as_str),
            role: user.role.as_str(),
            email_verified_at: user.email_verified_at,
            first_name: &user.profile.first_name,
            last_name: &user.profile.last_name,
            contact_email: user.profile.contact_email.as_deref(),
            contact_phone: user.profile.contact_phone.as_deref(),
            oauth_provider: user.oauth.as_ref().map(|l| l.provider.as_str()),
            oauth_subject: user.oauth.as_ref().map(|l| l.subject.as_str()),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Changeset for profile edits. `None` values are written as NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ProfileUpdate<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub contact_email: Option<&'a str>,
    pub contact_phone: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Credential tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = refresh_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RefreshTokenRow {
    pub token: String,
    pub user_id: Uuid,
    pub jti: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            token: row.token,
            user_id: UserId::from_uuid(row.user_id),
            jti: row.jti,
            revoked: row.revoked,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

impl From<&RefreshTokenRecord> for RefreshTokenRow {
    fn from(record: &RefreshTokenRecord) -> Self {
        Self {
            token: record.token.clone(),
            user_id: *record.user_id.as_uuid(),
            jti: record.jti.clone(),
            revoked: record.revoked,
            expires_at: record.expires_at,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = one_time_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OneTimeTokenRow {
    pub token: String,
    pub user_id: Uuid,
    pub purpose: String,
    pub new_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OneTimeTokenRow {
    pub fn into_domain(self) -> Result<OneTimeToken, StoreError> {
        let purpose = OneTimePurpose::parse(&self.purpose).ok_or_else(|| {
            StoreError::query(format!("unknown one-time token purpose {}", self.purpose))
        })?;
        Ok(OneTimeToken {
            token: self.token,
            user_id: UserId::from_uuid(self.user_id),
            purpose,
            new_email: self.new_email,
            created_at: self.created_at,
        })
    }
}

impl From<&OneTimeToken> for OneTimeTokenRow {
    fn from(token: &OneTimeToken) -> Self {
        Self {
            token: token.token.clone(),
            user_id: *token.user_id.as_uuid(),
            purpose: token.purpose.as_str().to_owned(),
            new_email: token.new_email.clone(),
            created_at: token.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
        }
    }
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: *category.id.as_uuid(),
            name: category.name.clone(),
            description: category.description.clone(),
            created_by: category.created_by.map(|id| *id.as_uuid()),
            created_at: category.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = placemarks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PlacemarkRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub street: String,
    pub house_number: String,
    pub zip: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: Option<String>,
    pub is_public: bool,
    pub view_count: i64,
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlacemarkRow> for Placemark {
    fn from(row: PlacemarkRow) -> Self {
        Self {
            id: PlacemarkId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            address: Address {
                street: row.street,
                house_number: row.house_number,
                zip: row.zip,
                city: row.city,
                country: row.country,
            },
            coordinates: Coordinates {
                latitude: row.latitude,
                longitude: row.longitude,
            },
            image_url: row.image_url,
            is_public: row.is_public,
            view_count: row.view_count,
            owner_id: UserId::from_uuid(row.owner_id),
            category_id: CategoryId::from_uuid(row.category_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Placemark> for PlacemarkRow {
    fn from(p: &Placemark) -> Self {
        Self {
            id: *p.id.as_uuid(),
            name: p.name.clone(),
            description: p.description.clone(),
            street: p.address.street.clone(),
            house_number: p.address.house_number.clone(),
            zip: p.address.zip.clone(),
            city: p.address.city.clone(),
            country: p.address.country.clone(),
            latitude: p.coordinates.latitude,
            longitude: p.coordinates.longitude,
            image_url: p.image_url.clone(),
            is_public: p.is_public,
            view_count: p.view_count,
            owner_id: *p.owner_id.as_uuid(),
            category_id: *p.category_id.as_uuid(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReviewRow {
    pub id: Uuid,
    pub rating: Option<i16>,
    pub comment: String,
    pub author_id: Uuid,
    pub placemark_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ReviewRow {
    pub fn into_domain(self) -> Result<Review, StoreError> {
        let rating = self
            .rating
            .map(u8::try_from)
            .transpose()
            .map_err(|_| StoreError::query(format!("review {} has an invalid rating", self.id)))?;
        Ok(Review {
            id: ReviewId::from_uuid(self.id),
            rating,
            comment: self.comment,
            author_id: UserId::from_uuid(self.author_id),
            placemark_id: PlacemarkId::from_uuid(self.placemark_id),
            parent_id: self.parent_id.map(ReviewId::from_uuid),
            created_at: self.created_at,
        })
    }
}

impl From<&Review> for ReviewRow {
    fn from(review: &Review) -> Self {
        Self {
            id: *review.id.as_uuid(),
            rating: review.rating.map(i16::from),
            comment: review.comment.clone(),
            author_id: *review.author_id.as_uuid(),
            placemark_id: *review.placemark_id.as_uuid(),
            parent_id: review.parent_id.map(|id| *id.as_uuid()),
            created_at: review.created_at,
        }
    }
}
