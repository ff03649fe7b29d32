//! Authentication primitives: login credentials, the password policy and
//! registration input.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a service.

use std::fmt;

use serde_json::json;
use zeroize::Zeroizing;

use super::user::{Email, Profile, UserValidationError, normalize_email};
use super::Error;

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials used by the session manager.
///
/// ## Invariants
/// - `email` is normalized (trimmed, lower-cased) and non-empty.
/// - `password` is non-empty but retains caller-provided whitespace.
///
/// # Examples
/// ```
/// use campsite::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" Ada@Example.com ", "pw").unwrap();
/// assert_eq!(creds.email(), "ada@example.com");
/// assert_eq!(creds.password(), "pw");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = normalize_email(email);
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyEmail);
        }
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            email: normalized,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl From<LoginValidationError> for Error {
    fn from(value: LoginValidationError) -> Self {
        Error::validation_failed(value.to_string())
    }
}

/// Minimum password length accepted by [`NewPassword`].
pub const PASSWORD_MIN: usize = 8;

/// Reasons a candidate password fails the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordPolicyError {
    #[error("password must be at least {PASSWORD_MIN} characters")]
    TooShort,
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    #[error("password must contain a digit")]
    MissingDigit,
    #[error("password must contain a special character")]
    MissingSpecial,
}

/// Plaintext password that satisfies the strength policy.
///
/// The buffer is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(Zeroizing<String>);

impl NewPassword {
    pub fn parse(raw: &str) -> Result<Self, PasswordPolicyError> {
        if raw.chars().count() < PASSWORD_MIN {
            return Err(PasswordPolicyError::TooShort);
        }
        if !raw.chars().any(char::is_uppercase) {
            return Err(PasswordPolicyError::MissingUppercase);
        }
        if !raw.chars().any(char::is_lowercase) {
            return Err(PasswordPolicyError::MissingLowercase);
        }
        if !raw.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordPolicyError::MissingDigit);
        }
        if raw.chars().all(char::is_alphanumeric) {
            return Err(PasswordPolicyError::MissingSpecial);
        }
        Ok(Self(Zeroizing::new(raw.to_owned())))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(..)")
    }
}

impl From<PasswordPolicyError> for Error {
    fn from(value: PasswordPolicyError) -> Self {
        field_error("password", value)
    }
}

impl From<UserValidationError> for Error {
    fn from(value: UserValidationError) -> Self {
        let field = match &value {
            UserValidationError::InvalidEmail => "email",
            UserValidationError::NameTooShort { field, .. } => *field,
            UserValidationError::UnknownRole => "role",
        };
        field_error(field, value)
    }
}

/// A `validation_failed` error naming the offending field.
pub fn field_error(field: &str, reason: impl fmt::Display) -> Error {
    let message = reason.to_string();
    Error::validation_failed(message.clone())
        .with_details(json!({ "field": field, "message": message }))
}

/// Validated input for account registration.
#[derive(Debug, Clone)]
pub struct Registration {
    email: Email,
    password: NewPassword,
    profile: Profile,
}

impl Registration {
    pub fn try_new(
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Self, Error> {
        let email = Email::parse(email)?;
        let password = NewPassword::parse(password)?;
        let profile = Profile::from_names(first_name, last_name)?;
        Ok(Self {
            email,
            password,
            profile,
        })
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password(&self) -> &NewPassword {
        &self.password
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}
