//! Port for third-party identity token verification.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by OAuth verifier adapters.
    pub enum OAuthVerifierError {
        /// The provider did not accept the token.
        Rejected { message: String } => "identity token rejected: {message}",
        /// Transport failure or timeout.
        Transport { message: String } => "identity provider unreachable: {message}",
    }
}

/// Profile asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleProfile {
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleProfile, OAuthVerifierError>;
}

/// Verifier used when no OAuth client is configured; every token is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledOAuthVerifier;

#[async_trait]
impl OAuthVerifier for DisabledOAuthVerifier {
    async fn verify(&self, _id_token: &str) -> Result<GoogleProfile, OAuthVerifierError> {
        Err(OAuthVerifierError::rejected("Google sign-in is not configured"))
    }
}
