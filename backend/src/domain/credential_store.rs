//! Handles onto the credential store, bundled for injection into services.

use std::sync::Arc;

use tokio::task;
use zeroize::Zeroizing;

use super::ports::{
    CredentialUnitOfWork, OneTimeTokenRepository, PasswordHasher, RefreshTokenRepository,
    UserRepository,
};
use super::{Error, PasswordHash};

/// Repository and unit-of-work ports that make up the credential store.
#[derive(Clone)]
pub struct CredentialStore {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub one_time_tokens: Arc<dyn OneTimeTokenRepository>,
    pub unit_of_work: Arc<dyn CredentialUnitOfWork>,
}

/// Runs the password hasher on the blocking pool.
#[derive(Clone)]
pub struct Passwords {
    hasher: Arc<dyn PasswordHasher>,
}

impl Passwords {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { hasher }
    }

    pub async fn hash(&self, password: &str) -> Result<PasswordHash, Error> {
        let hasher = Arc::clone(&self.hasher);
        let password = Zeroizing::new(password.to_owned());
        task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| Error::internal(format!("password hashing task failed: {err}")))?
            .map_err(|err| Error::internal(err.to_string()))
    }

    pub async fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, Error> {
        let hasher = Arc::clone(&self.hasher);
        let password = Zeroizing::new(password.to_owned());
        let hash = hash.clone();
        task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|err| Error::internal(format!("password verification task failed: {err}")))?
            .map_err(|err| Error::internal(err.to_string()))
    }
}
