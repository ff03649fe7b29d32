//! Account use-cases outside the session lifecycle: registration, email
//! verification, profile management, email change and Google sign-in.

use std::sync::Arc;

use tracing::{info, warn};

use super::ports::{GoogleProfile, MailMessage, MailSender, OAuthVerifier, OAuthVerifierError, StoreError};
use super::session::{AppLinks, LoginOutcome, SessionManager, token_failure};
use super::tokens::{EmailChangeClaims, EmailVerificationClaims};
use super::user::validated_name;
use super::{
    AuthError, ConsumeOutcome, CredentialStore, Email, Error, GOOGLE_PROVIDER, OAuthLink,
    OneTimePurpose, OneTimeToken, Passwords, Profile, PublicUser, Registration, Role, User,
    UserId, title_case,
};

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl ProfileUpdate {
    fn apply(&self, profile: &mut Profile) -> Result<(), Error> {
        if let Some(first) = &self.first_name {
            profile.first_name = validated_name("firstName", first)?;
        }
        if let Some(last) = &self.last_name {
            profile.last_name = validated_name("lastName", last)?;
        }
        if let Some(contact) = &self.contact_email {
            profile.contact_email = non_blank(contact);
        }
        if let Some(phone) = &self.contact_phone {
            profile.contact_phone = non_blank(phone);
        }
        Ok(())
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[derive(Clone)]
pub struct AccountService {
    store: CredentialStore,
    sessions: SessionManager,
    passwords: Passwords,
    mail: Arc<dyn MailSender>,
    oauth: Arc<dyn OAuthVerifier>,
    links: AppLinks,
}

impl AccountService {
    pub fn new(
        store: CredentialStore,
        sessions: SessionManager,
        passwords: Passwords,
        mail: Arc<dyn MailSender>,
        oauth: Arc<dyn OAuthVerifier>,
        links: AppLinks,
    ) -> Self {
        Self {
            store,
            sessions,
            passwords,
            mail,
            oauth,
            links,
        }
    }

    /// Create an unverified account and email a verification link.
    ///
    /// A failed verification mail is logged and does not undo the account.
    pub async fn register(&self, registration: Registration) -> Result<PublicUser, Error> {
        let email = registration.email();
        if self.store.users.find_by_email(email.as_ref()).await?.is_some() {
            return Err(AuthError::EmailTaken.into());
        }

        let hash = self.passwords.hash(registration.password().expose()).await?;
        let now = self.sessions.codec().now();
        let user = User {
            id: UserId::random(),
            email: email.clone(),
            password_hash: Some(hash),
            role: Role::User,
            email_verified_at: None,
            profile: registration.profile().clone(),
            oauth: None,
            created_at: now,
            updated_at: now,
        };
        self.store.users.insert(&user).await.map_err(email_conflict)?;
        info!(user_id = %user.id, "account registered");

        let token = self
            .sessions
            .codec()
            .issue_one_time(EmailVerificationClaims {
                id: user.id,
                email: user.email.to_string(),
            })
            .map_err(token_failure)?;
        let link = self.links.api_link("/auth/verify-email", &token);
        let message = MailMessage {
            to: user.email.to_string(),
            subject: "Verify your email".to_owned(),
            html: format!(
                "<p>Hello {},</p><p>Please verify your email by clicking the link below:</p>\
                 <p><a href=\"{link}\">Verify Email</a></p>",
                user.profile.first_name
            ),
        };
        if let Err(err) = self.mail.send(&message).await {
            warn!(user_id = %user.id, error = %err, "verification mail failed");
        }
        Ok(user.to_public())
    }

    /// Mark the account named by a verification token as verified.
    pub async fn verify_email(&self, token: &str) -> Result<(), Error> {
        let claims: EmailVerificationClaims =
            self.sessions.codec().verify(token).map_err(token_failure)?;
        let user = self
            .store
            .users
            .find_by_id(claims.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.is_verified() {
            return Err(AuthError::AlreadyVerified.into());
        }
        if !self
            .store
            .users
            .mark_verified(user.id, self.sessions.codec().now())
            .await?
        {
            return Err(AuthError::UserNotFound.into());
        }
        info!(user_id = %user.id, "email verified");
        Ok(())
    }

    pub async fn me(&self, user_id: UserId) -> Result<PublicUser, Error> {
        let user = self
            .store
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(user.to_public())
    }

    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<PublicUser, Error> {
        let user = self
            .store
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let mut profile = user.profile;
        update.apply(&mut profile)?;
        let updated = self
            .store
            .users
            .update_profile(user_id, &profile, self.sessions.codec().now())
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(updated.to_public())
    }

    /// Delete the caller's own account and everything it owns.
    pub async fn delete_account(&self, user_id: UserId) -> Result<(), Error> {
        if !self.store.users.delete(user_id).await? {
            return Err(AuthError::UserNotFound.into());
        }
        info!(%user_id, "account deleted by owner");
        Ok(())
    }

    /// Email a confirmation link to the requested new address.
    pub async fn request_email_change(&self, user_id: UserId, new_email: &Email) -> Result<(), Error> {
        if let Some(owner) = self.store.users.find_by_email(new_email.as_ref()).await? {
            if owner.id != user_id {
                return Err(AuthError::EmailTaken.into());
            }
            return Err(Error::invalid_request("This is already your email address"));
        }

        let token = self
            .sessions
            .codec()
            .issue_one_time(EmailChangeClaims {
                id: user_id,
                new_email: new_email.to_string(),
            })
            .map_err(token_failure)?;
        self.store
            .one_time_tokens
            .insert(&OneTimeToken {
                token: token.clone(),
                user_id,
                purpose: OneTimePurpose::EmailChange,
                new_email: Some(new_email.to_string()),
                created_at: self.sessions.codec().now(),
            })
            .await?;

        let link = self.links.api_link("/auth/confirm-email-change", &token);
        let message = MailMessage {
            to: new_email.to_string(),
            subject: "Confirm your new email address".to_owned(),
            html: format!(
                "<p>Confirm this address for your account:</p>\
                 <p><a href=\"{link}\">Confirm email</a></p>"
            ),
        };
        self.mail
            .send(&message)
            .await
            .map_err(|err| Error::transient_failure(err.to_string()))?;
        info!(%user_id, "email change requested");
        Ok(())
    }

    /// Consume an email-change token and switch the address.
    pub async fn confirm_email_change(&self, token: &str) -> Result<(), Error> {
        let claims: EmailChangeClaims =
            self.sessions.codec().verify(token).map_err(token_failure)?;
        let row = self
            .store
            .one_time_tokens
            .find(token, OneTimePurpose::EmailChange)
            .await?
            .filter(|row| {
                row.user_id == claims.id && row.new_email.as_deref() == Some(&claims.new_email)
            })
            .ok_or(AuthError::InvalidOrExpiredToken)?;
        let new_email = Email::parse(&claims.new_email)?;

        match self
            .store
            .unit_of_work
            .change_email(&row.token, row.user_id, &new_email)
            .await
            .map_err(email_conflict)?
        {
            ConsumeOutcome::Applied => {
                info!(user_id = %row.user_id, "email changed");
                Ok(())
            }
            ConsumeOutcome::AlreadyConsumed => Err(AuthError::InvalidOrExpiredToken.into()),
        }
    }

    /// Sign in with a Google ID token, creating the account on first use.
    ///
    /// An address already registered with a password is never merged.
    pub async fn google_sign_in(&self, id_token: &str) -> Result<LoginOutcome, Error> {
        let profile = self.oauth.verify(id_token).await.map_err(|err| match err {
            OAuthVerifierError::Rejected { .. } => {
                warn!(error = %err, "google token rejected");
                Error::from(AuthError::OAuthRejected)
            }
            OAuthVerifierError::Transport { .. } => Error::transient_failure(err.to_string()),
        })?;

        let existing = self
            .store
            .users
            .find_by_oauth(GOOGLE_PROVIDER, &profile.subject)
            .await?;
        let user = match existing {
            Some(user) => user,
            None => self.create_google_user(&profile).await?,
        };

        let tokens = self.sessions.start_session(&user).await?;
        info!(user_id = %user.id, "google sign-in succeeded");
        Ok(LoginOutcome {
            user: user.to_public(),
            tokens,
        })
    }

    async fn create_google_user(&self, profile: &GoogleProfile) -> Result<User, Error> {
        let email = Email::parse(&profile.email).map_err(|_| AuthError::OAuthRejected)?;
        if self.store.users.find_by_email(email.as_ref()).await?.is_some() {
            warn!("google sign-in refused: email registered with another method");
            return Err(AuthError::OAuthEmailConflict.into());
        }
        let now = self.sessions.codec().now();
        let user = User {
            id: UserId::random(),
            email,
            password_hash: None,
            role: Role::User,
            email_verified_at: profile.email_verified.then_some(now),
            profile: Profile {
                first_name: title_case(profile.given_name.as_deref().unwrap_or_default().trim()),
                last_name: title_case(profile.family_name.as_deref().unwrap_or_default().trim()),
                contact_email: None,
                contact_phone: None,
            },
            oauth: Some(OAuthLink {
                provider: GOOGLE_PROVIDER.to_owned(),
                subject: profile.subject.clone(),
            }),
            created_at: now,
            updated_at: now,
        };
        self.store.users.insert(&user).await.map_err(|err| match err {
            StoreError::Conflict { .. } => Error::from(AuthError::OAuthEmailConflict),
            other => other.into(),
        })?;
        info!(user_id = %user.id, "account created from google profile");
        Ok(user)
    }
}

fn email_conflict(err: StoreError) -> Error {
    match err {
        StoreError::Conflict { .. } => AuthError::EmailTaken.into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests;
