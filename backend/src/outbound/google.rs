//! Google ID-token verifier backed by the `tokeninfo` endpoint.
//!
//! Google checks the signature and expiry; this adapter checks that the token
//! was minted for our client id and maps the payload onto [`GoogleProfile`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::warn;

use super::http_support::{body_preview, build_client};
use crate::domain::ports::{GoogleProfile, OAuthVerifier, OAuthVerifierError};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

pub struct GoogleTokenVerifier {
    client: Client,
    endpoint: Url,
    client_id: String,
}

impl GoogleTokenVerifier {
    /// # Errors
    ///
    /// Returns [`OAuthVerifierError::Transport`] when the client cannot be
    /// built.
    pub fn new(client_id: impl Into<String>, timeout: Duration) -> Result<Self, OAuthVerifierError> {
        let endpoint = Url::parse(TOKENINFO_URL)
            .map_err(|err| OAuthVerifierError::transport(err.to_string()))?;
        let client =
            build_client(timeout).map_err(|err| OAuthVerifierError::transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            client_id: client_id.into(),
        })
    }
}

/// `tokeninfo` encodes booleans as strings.
#[derive(Debug, Deserialize)]
struct TokenInfoDto {
    aud: String,
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

#[async_trait]
impl OAuthVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleProfile, OAuthVerifierError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|err| OAuthVerifierError::transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| OAuthVerifierError::transport(err.to_string()))?;
        if status.is_client_error() {
            return Err(OAuthVerifierError::rejected(body_preview(&body)));
        }
        if !status.is_success() {
            return Err(OAuthVerifierError::transport(format!(
                "status {}",
                status.as_u16()
            )));
        }
        profile_from_tokeninfo(&body, &self.client_id)
    }
}

fn profile_from_tokeninfo(
    body: &[u8],
    client_id: &str,
) -> Result<GoogleProfile, OAuthVerifierError> {
    let info: TokenInfoDto = serde_json::from_slice(body)
        .map_err(|err| OAuthVerifierError::rejected(format!("unreadable token info: {err}")))?;
    if info.aud != client_id {
        warn!(audience = %info.aud, "google token issued for another client");
        return Err(OAuthVerifierError::rejected("audience mismatch"));
    }
    let Some(email) = info.email else {
        return Err(OAuthVerifierError::rejected("token carries no email"));
    };
    Ok(GoogleProfile {
        subject: info.sub,
        email,
        email_verified: info.email_verified.as_deref() == Some("true"),
        given_name: info.given_name,
        family_name: info.family_name,
    })
}
