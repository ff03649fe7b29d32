//! Credential lifecycle failures and their transport mapping.
//!
//! Every authentication outcome the services can signal is one variant of
//! [`AuthError`]. The [`From`] conversion into [`Error`] is the single table
//! deciding which transport code each variant surfaces as.

use super::{Error, ErrorCode};

/// Closed set of authentication and session failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email address has not been verified")]
    EmailNotVerified,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("Authentication required")]
    MissingBearer,
    #[error("Invalid or expired access token")]
    AccessTokenInvalid,
    #[error("Token has been revoked")]
    TokenRevoked,
    #[error("Account no longer exists")]
    UnknownIdentity,
    #[error("Admin role required")]
    AdminRequired,
    #[error("This account signs in with Google and has no password to reset")]
    GoogleAccountError,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Email address is already verified")]
    AlreadyVerified,
    #[error("User not found")]
    UserNotFound,
    #[error("This account has no password set")]
    NoPasswordSet,
    #[error("Current password is incorrect")]
    InvalidPassword,
    #[error("An account with this email already exists; sign in with your password")]
    OAuthEmailConflict,
    #[error("Identity provider rejected the token")]
    OAuthRejected,
}

impl AuthError {
    /// Transport code for this failure.
    pub fn code(self) -> ErrorCode {
        match self {
            Self::InvalidCredentials
            | Self::EmailNotVerified
            | Self::InvalidOrExpiredToken
            | Self::GoogleAccountError
            | Self::AlreadyVerified
            | Self::NoPasswordSet
            | Self::InvalidPassword => ErrorCode::InvalidRequest,
            Self::InvalidRefreshToken
            | Self::MissingBearer
            | Self::AccessTokenInvalid
            | Self::TokenRevoked
            | Self::UnknownIdentity
            | Self::OAuthRejected => ErrorCode::Unauthorized,
            Self::AdminRequired => ErrorCode::Forbidden,
            Self::EmailTaken => ErrorCode::ValidationFailed,
            Self::UserNotFound => ErrorCode::NotFound,
            Self::OAuthEmailConflict => ErrorCode::Conflict,
        }
    }
}

impl From<AuthError> for Error {
    fn from(value: AuthError) -> Self {
        Error::new(value.code(), value.to_string())
    }
}
