//! Session manager: login, refresh rotation, logout and password flows.
//!
//! Every refresh token is single use. Refreshing revokes the presented row
//! and stores exactly one replacement through
//! [`CredentialUnitOfWork::rotate_refresh_token`], whose conditional revoke
//! guarantees that of two concurrent refreshes on one token only one wins.
//!
//! [`CredentialUnitOfWork::rotate_refresh_token`]:
//! super::ports::CredentialUnitOfWork::rotate_refresh_token

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::ports::{MailMessage, MailSender};
use super::tokens::{PasswordResetClaims, RefreshClaims, TokenCodec, TokenError};
use super::{
    AuthError, ConsumeOutcome, CredentialStore, Error, LoginCredentials, NewPassword,
    OneTimePurpose, OneTimeToken, Passwords, PublicUser, RefreshTokenRecord, RotationOutcome,
    User, UserId, normalize_email,
};

/// Base URLs embedded in emailed links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLinks {
    /// Public URL of this API.
    pub app_url: String,
    /// URL of the web client.
    pub frontend_url: String,
}

impl AppLinks {
    pub fn api_link(&self, path: &str, token: &str) -> String {
        format!("{}{path}?token={token}", self.app_url.trim_end_matches('/'))
    }

    pub fn frontend_link(&self, path: &str, token: &str) -> String {
        format!(
            "{}{path}?token={token}",
            self.frontend_url.trim_end_matches('/')
        )
    }
}

/// Access and refresh token issued together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(skip)]
    pub refresh_token: String,
}

/// Successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

pub(crate) fn token_failure(err: TokenError) -> Error {
    match err {
        TokenError::Invalid => AuthError::InvalidOrExpiredToken.into(),
        TokenError::Signing { message } => Error::internal(message),
    }
}

/// Owns the credential lifecycle against the credential store.
#[derive(Clone)]
pub struct SessionManager {
    store: CredentialStore,
    codec: TokenCodec,
    passwords: Passwords,
    mail: Arc<dyn MailSender>,
    links: AppLinks,
}

impl SessionManager {
    pub fn new(
        store: CredentialStore,
        codec: TokenCodec,
        passwords: Passwords,
        mail: Arc<dyn MailSender>,
        links: AppLinks,
    ) -> Self {
        Self {
            store,
            codec,
            passwords,
            mail,
            links,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate with email and password and open a session.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginOutcome, Error> {
        let Some(user) = self.store.users.find_by_email(credentials.email()).await? else {
            warn!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !user.is_verified() {
            warn!(user_id = %user.id, "login rejected: email not verified");
            return Err(AuthError::EmailNotVerified.into());
        }
        let Some(hash) = user.password_hash.as_ref() else {
            warn!(user_id = %user.id, "login rejected: account has no password");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !self.passwords.verify(credentials.password(), hash).await? {
            warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.start_session(&user).await?;
        info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutcome {
            user: user.to_public(),
            tokens,
        })
    }

    /// Issue a token pair for `user` and persist the refresh row.
    pub async fn start_session(&self, user: &User) -> Result<TokenPair, Error> {
        let (tokens, record) = self.issue_pair(user)?;
        self.store.refresh_tokens.insert(&record).await?;
        Ok(tokens)
    }

    fn issue_pair(&self, user: &User) -> Result<(TokenPair, RefreshTokenRecord), Error> {
        let access = self
            .codec
            .issue_access(user.id, user.email.as_ref(), user.role)
            .map_err(token_failure)?;
        let refresh = self
            .codec
            .issue_refresh(user.id, user.email.as_ref())
            .map_err(token_failure)?;
        let record = RefreshTokenRecord {
            token: refresh.token.clone(),
            user_id: user.id,
            jti: access.jti,
            revoked: false,
            expires_at: refresh.expires_at,
            created_at: self.codec.now(),
        };
        Ok((
            TokenPair {
                access_token: access.token,
                refresh_token: refresh.token,
            },
            record,
        ))
    }

    /// Exchange a refresh token for a new pair, revoking the presented one.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, Error> {
        let record = self.store.refresh_tokens.find_by_token(presented).await?;
        let Some(record) = record.filter(|r| r.is_usable(self.codec.now())) else {
            warn!("refresh rejected: unknown, revoked or expired token");
            return Err(AuthError::InvalidRefreshToken.into());
        };
        let claims: RefreshClaims = self.codec.verify(presented).map_err(|_| {
            warn!(user_id = %record.user_id, "refresh rejected: signature or expiry");
            Error::from(AuthError::InvalidRefreshToken)
        })?;
        if claims.id != record.user_id {
            warn!(user_id = %record.user_id, "refresh rejected: claims do not match row");
            return Err(AuthError::InvalidRefreshToken.into());
        }
        let Some(user) = self.store.users.find_by_id(record.user_id).await? else {
            return Err(AuthError::InvalidRefreshToken.into());
        };

        let (tokens, replacement) = self.issue_pair(&user)?;
        match self
            .store
            .unit_of_work
            .rotate_refresh_token(presented, &replacement)
            .await?
        {
            RotationOutcome::Rotated => {
                info!(user_id = %user.id, "refresh token rotated");
                Ok(tokens)
            }
            RotationOutcome::Stale => {
                warn!(user_id = %user.id, "refresh rejected: token already rotated");
                Err(AuthError::InvalidRefreshToken.into())
            }
        }
    }

    /// Revoke the presented refresh token. Absent or unknown tokens succeed.
    pub async fn logout(&self, presented: Option<&str>) -> Result<(), Error> {
        let Some(token) = presented else {
            return Ok(());
        };
        if self.store.refresh_tokens.revoke(token).await? {
            info!("refresh token revoked on logout");
        }
        Ok(())
    }

    /// Change the caller's password and end every session they hold.
    pub async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &NewPassword,
    ) -> Result<(), Error> {
        let user = self
            .store
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let hash = user
            .password_hash
            .as_ref()
            .ok_or(AuthError::NoPasswordSet)?;
        if !self.passwords.verify(old_password, hash).await? {
            warn!(%user_id, "password change rejected: wrong current password");
            return Err(AuthError::InvalidPassword.into());
        }
        let new_hash = self.passwords.hash(new_password.expose()).await?;
        self.store
            .unit_of_work
            .replace_password(user_id, &new_hash)
            .await?;
        info!(%user_id, "password changed; refresh tokens cleared");
        Ok(())
    }

    /// Email a password reset link.
    pub async fn forgot_password(&self, email: &str) -> Result<(), Error> {
        let user = self
            .store
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.password_hash.is_none() {
            return Err(AuthError::GoogleAccountError.into());
        }

        let token = self
            .codec
            .issue_one_time(PasswordResetClaims {
                user_id: user.id,
                email: user.email.to_string(),
            })
            .map_err(token_failure)?;
        self.store
            .one_time_tokens
            .insert(&OneTimeToken {
                token: token.clone(),
                user_id: user.id,
                purpose: OneTimePurpose::PasswordReset,
                new_email: None,
                created_at: self.codec.now(),
            })
            .await?;

        let link = self.links.frontend_link("/reset-password", &token);
        let message = MailMessage {
            to: user.email.to_string(),
            subject: "Reset your password".to_owned(),
            html: format!(
                "<p>Hello {},</p><p>Reset your password using the link below. \
                 It expires in one hour.</p><p><a href=\"{link}\">Reset password</a></p>",
                user.profile.first_name
            ),
        };
        self.mail.send(&message).await.map_err(|err| {
            warn!(user_id = %user.id, error = %err, "reset mail failed");
            Error::transient_failure(err.to_string())
        })?;
        info!(user_id = %user.id, "password reset requested");
        Ok(())
    }

    /// Consume a reset token and set a new password.
    pub async fn reset_password(&self, token: &str, new_password: &NewPassword) -> Result<(), Error> {
        let claims: PasswordResetClaims = self.codec.verify(token).map_err(token_failure)?;
        let row = self
            .store
            .one_time_tokens
            .find(token, OneTimePurpose::PasswordReset)
            .await?
            .filter(|row| row.user_id == claims.user_id)
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let hash = self.passwords.hash(new_password.expose()).await?;
        match self
            .store
            .unit_of_work
            .reset_password(&row.token, row.user_id, &hash)
            .await?
        {
            ConsumeOutcome::Applied => {
                info!(user_id = %row.user_id, "password reset; refresh tokens cleared");
                Ok(())
            }
            ConsumeOutcome::AlreadyConsumed => Err(AuthError::InvalidOrExpiredToken.into()),
        }
    }
}

#[cfg(test)]
mod tests;
