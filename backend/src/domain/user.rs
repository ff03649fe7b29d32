//! User account model.
//!
//! A [`User`] is the credential-bearing record; the [`PublicUser`] projection
//! is what leaves the service boundary and never carries the password hash.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use super::ids::UserId;

/// Validation errors for user-facing account fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("email must be a valid address")]
    InvalidEmail,
    #[error("{field} must be at least {min} characters")]
    NameTooShort { field: &'static str, min: usize },
    #[error("role must be USER or ADMIN")]
    UnknownRole,
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Normalized email address: trimmed and lower-cased.
///
/// # Examples
/// ```
/// use campsite::domain::Email;
///
/// let email = Email::parse("  Ada@Example.COM ").unwrap();
/// assert_eq!(email.as_ref(), "ada@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalized = normalize_email(raw.as_ref());
        if !email_regex().is_match(&normalized) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalized))
    }
}

/// Trim and lower-case an address without validating it.
///
/// Lookups use this so a malformed login email simply finds no account.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(UserValidationError::UnknownRole),
        }
    }
}

/// Stored password hash in PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Minimum length of first and last names.
pub const NAME_MIN: usize = 2;

/// Personal details owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl Profile {
    /// Build a profile from raw names, trimming and title-casing them.
    pub fn from_names(first_name: &str, last_name: &str) -> Result<Self, UserValidationError> {
        Ok(Self {
            first_name: validated_name("firstName", first_name)?,
            last_name: validated_name("lastName", last_name)?,
            contact_email: None,
            contact_phone: None,
        })
    }
}

pub(crate) fn validated_name(
    field: &'static str,
    raw: &str,
) -> Result<String, UserValidationError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < NAME_MIN {
        return Err(UserValidationError::NameTooShort {
            field,
            min: NAME_MIN,
        });
    }
    Ok(title_case(trimmed))
}

/// Upper-case the first letter of each whitespace or hyphen separated word
/// and lower-case the rest.
///
/// # Examples
/// ```
/// use campsite::domain::title_case;
///
/// assert_eq!(title_case("aNNe-marie o'neil"), "Anne-Marie O'neil");
/// ```
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for ch in raw.chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        at_word_start = ch.is_whitespace() || ch == '-';
    }
    out
}

/// External identity provider link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthLink {
    pub provider: String,
    pub subject: String,
}

/// Provider name stored for Google sign-in links.
pub const GOOGLE_PROVIDER: &str = "google";

/// Stored user account.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub password_hash: Option<PasswordHash>,
    pub role: Role,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub profile: Profile,
    pub oauth: Option<OAuthLink>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// True when the account can only sign in through an identity provider.
    pub fn is_oauth_only(&self) -> bool {
        self.password_hash.is_none() && self.oauth.is_some()
    }

    /// Client-facing projection with the password hash removed.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.to_string(),
            role: self.role,
            email_verified_at: self.email_verified_at,
            profile: self.profile.clone(),
            oauth_provider: self.oauth.as_ref().map(|link| link.provider.clone()),
            oauth_id: self.oauth.as_ref().map(|link| link.subject.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub profile: Profile,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
