//! Signed token issue and verification.
//!
//! Every token kind is an HS256 JWT signed with the same secret. The payload
//! carries a `purpose` discriminator next to the claims so a token minted for
//! one flow never verifies as another. Expiry is checked against the injected
//! clock with zero leeway.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{Role, UserId};

/// Flow a token was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    Refresh,
    PasswordReset,
    EmailVerification,
    EmailChange,
}

/// Claim sets that can be signed by [`TokenCodec`].
pub trait TokenClaims: Serialize + DeserializeOwned {
    const PURPOSE: TokenPurpose;
}

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl TokenClaims for AccessClaims {
    const PURPOSE: TokenPurpose = TokenPurpose::Access;
}

/// Refresh token claims.
///
/// `nonce` keeps two refresh tokens issued for the same user within one
/// second distinct, since the token string is the stored row's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: UserId,
    pub email: String,
    pub nonce: String,
}

impl TokenClaims for RefreshClaims {
    const PURPOSE: TokenPurpose = TokenPurpose::Refresh;
}

/// Claims of a password reset link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetClaims {
    pub user_id: UserId,
    pub email: String,
}

impl TokenClaims for PasswordResetClaims {
    const PURPOSE: TokenPurpose = TokenPurpose::PasswordReset;
}

/// Claims of an email verification link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailVerificationClaims {
    pub id: UserId,
    pub email: String,
}

impl TokenClaims for EmailVerificationClaims {
    const PURPOSE: TokenPurpose = TokenPurpose::EmailVerification;
}

/// Claims of an email change confirmation; `new_email` is the target address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailChangeClaims {
    pub id: UserId,
    pub new_email: String,
}

impl TokenClaims for EmailChangeClaims {
    const PURPOSE: TokenPurpose = TokenPurpose::EmailChange;
}

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtls {
    pub access: Duration,
    pub admin_access: Duration,
    pub refresh: Duration,
    pub one_time: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            admin_access: Duration::minutes(30),
            refresh: Duration::days(7),
            one_time: Duration::hours(1),
        }
    }
}

impl TokenTtls {
    /// Access-token lifetime for `role`.
    pub fn access_for(&self, role: Option<Role>) -> Duration {
        match role {
            Some(Role::Admin) => self.admin_access,
            _ => self.access,
        }
    }
}

/// Failures raised by [`TokenCodec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, malformed payload, wrong purpose or expired.
    #[error("token is invalid or expired")]
    Invalid,
    #[error("failed to sign token: {message}")]
    Signing { message: String },
}

/// Freshly issued access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedAccess {
    pub token: String,
    pub jti: String,
}

/// Freshly issued refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedRefresh {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct Envelope<C> {
    #[serde(flatten)]
    claims: C,
    purpose: TokenPurpose,
    iat: i64,
    exp: i64,
    /// Kept apart from any `nonce` the claims themselves carry.
    #[serde(rename = "otn", default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
}

/// Signs and verifies every token kind with one shared HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttls: TokenTtls,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttls", &self.ttls)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttls: TokenTtls, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against `clock` in `verify`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttls,
            clock,
        }
    }

    pub fn ttls(&self) -> &TokenTtls {
        &self.ttls
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Sign `claims` with an expiry `ttl` from now.
    pub fn issue<C: TokenClaims>(&self, claims: C, ttl: Duration) -> Result<String, TokenError> {
        self.sign(claims, ttl, None)
    }

    fn sign<C: TokenClaims>(
        &self,
        claims: C,
        ttl: Duration,
        nonce: Option<String>,
    ) -> Result<String, TokenError> {
        let now = self.clock.utc();
        let envelope = Envelope {
            claims,
            purpose: C::PURPOSE,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nonce,
        };
        encode(&Header::new(Algorithm::HS256), &envelope, &self.encoding).map_err(|err| {
            TokenError::Signing {
                message: err.to_string(),
            }
        })
    }

    /// Verify signature, purpose and expiry, returning the claims.
    pub fn verify<C: TokenClaims>(&self, token: &str) -> Result<C, TokenError> {
        let data = decode::<Envelope<C>>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Invalid)?;
        let envelope = data.claims;
        if envelope.purpose != C::PURPOSE {
            return Err(TokenError::Invalid);
        }
        if self.clock.utc().timestamp() >= envelope.exp {
            return Err(TokenError::Invalid);
        }
        Ok(envelope.claims)
    }

    /// Issue an access token with a fresh `jti` and a role-aware lifetime.
    pub fn issue_access(
        &self,
        id: UserId,
        email: &str,
        role: Role,
    ) -> Result<IssuedAccess, TokenError> {
        let jti = Uuid::new_v4().to_string();
        let claims = AccessClaims {
            id,
            email: email.to_owned(),
            role: Some(role),
            jti: Some(jti.clone()),
        };
        let token = self.issue(claims, self.ttls.access_for(Some(role)))?;
        Ok(IssuedAccess { token, jti })
    }

    /// Issue a refresh token; it carries no `jti`.
    pub fn issue_refresh(&self, id: UserId, email: &str) -> Result<IssuedRefresh, TokenError> {
        let claims = RefreshClaims {
            id,
            email: email.to_owned(),
            nonce: Uuid::new_v4().simple().to_string(),
        };
        let expires_at = self.clock.utc() + self.ttls.refresh;
        let token = self.issue(claims, self.ttls.refresh)?;
        Ok(IssuedRefresh { token, expires_at })
    }

    /// Issue a one-time token (reset, verification, email change).
    ///
    /// The envelope nonce keeps repeated requests within one second from
    /// minting the same token string, which is the stored row's key.
    pub fn issue_one_time<C: TokenClaims>(&self, claims: C) -> Result<String, TokenError> {
        let nonce = Uuid::new_v4().simple().to_string();
        self.sign(claims, self.ttls.one_time, Some(nonce))
    }
}
