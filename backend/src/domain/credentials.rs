//! Persisted credential records: refresh tokens and one-time tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserId;

/// Stored refresh token.
///
/// The token string is the row's identity; `jti` ties it to the access token
/// issued in the same login or rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: UserId,
    pub jti: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Whether the row may still be exchanged or back an access token.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// Flow a one-time token row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneTimePurpose {
    PasswordReset,
    EmailChange,
}

impl OneTimePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PasswordReset => "password_reset",
            Self::EmailChange => "email_change",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "password_reset" => Some(Self::PasswordReset),
            "email_change" => Some(Self::EmailChange),
            _ => None,
        }
    }
}

/// Stored single-use token proving a signed link has not been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeToken {
    pub token: String,
    pub user_id: UserId,
    pub purpose: OneTimePurpose,
    /// Requested address for email changes.
    pub new_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of a conditional refresh-token rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The presented row was revoked and its replacement stored.
    Rotated,
    /// The presented row was already revoked or missing; nothing changed.
    Stale,
}

/// Result of consuming a one-time token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Applied,
    /// The row was gone; the whole unit of work was rolled back.
    AlreadyConsumed,
}
