//! Authorization guard: bearer token to resolved caller identity.
//!
//! Required resolution rejects with a specific [`AuthError`]; optional
//! resolution swallows every failure and yields no identity. Tokens that
//! carry a `jti` are checked against the refresh-token row minted alongside
//! them on every call, which is how logout and password changes cut off
//! access tokens before they expire.

use std::sync::Arc;

use tracing::{debug, warn};

use super::ports::{RefreshTokenRepository, UserRepository};
use super::tokens::{AccessClaims, TokenCodec};
use super::{AuthError, Error, Role, UserId};

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub jti: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// # Examples
/// ```
/// use campsite::domain::bearer_token;
///
/// assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
/// assert_eq!(bearer_token(Some("Basic abc")), None);
/// assert_eq!(bearer_token(None), None);
/// ```
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[derive(Clone)]
pub struct AuthGuard {
    codec: TokenCodec,
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
}

impl AuthGuard {
    pub fn new(
        codec: TokenCodec,
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
    ) -> Self {
        Self {
            codec,
            users,
            refresh_tokens,
        }
    }

    /// Resolve the caller or fail with 401.
    pub async fn require(&self, authorization: Option<&str>) -> Result<Identity, Error> {
        let token = bearer_token(authorization).ok_or(AuthError::MissingBearer)?;
        let claims: AccessClaims = self
            .codec
            .verify(token)
            .map_err(|_| AuthError::AccessTokenInvalid)?;

        if let Some(jti) = claims.jti.as_deref() {
            let row = self.refresh_tokens.find_by_jti(jti).await?;
            if !row.is_some_and(|row| !row.revoked) {
                warn!(user_id = %claims.id, "revoked access token presented");
                return Err(AuthError::TokenRevoked.into());
            }
        }

        let role = match claims.role {
            Some(role) => role,
            None => {
                self.users
                    .find_by_id(claims.id)
                    .await?
                    .ok_or(AuthError::UnknownIdentity)?
                    .role
            }
        };

        Ok(Identity {
            user_id: claims.id,
            email: claims.email,
            role,
            jti: claims.jti,
        })
    }

    /// Resolve the caller if possible; any failure means anonymous.
    pub async fn optional(&self, authorization: Option<&str>) -> Option<Identity> {
        authorization?;
        match self.require(authorization).await {
            Ok(identity) => Some(identity),
            Err(err) => {
                debug!(error = %err, "optional auth fell back to anonymous");
                None
            }
        }
    }

    /// Resolve the caller and insist on the admin role.
    pub async fn require_admin(&self, authorization: Option<&str>) -> Result<Identity, Error> {
        let identity = self.require(authorization).await?;
        ensure_admin(&identity)?;
        Ok(identity)
    }
}

/// Fail with 403 unless `identity` is an admin.
pub fn ensure_admin(identity: &Identity) -> Result<(), Error> {
    if identity.is_admin() {
        Ok(())
    } else {
        warn!(user_id = %identity.user_id, "admin-only operation refused");
        Err(AuthError::AdminRequired.into())
    }
}

#[cfg(test)]
mod tests;
