//! Application settings loaded via OrthoConfig.
//!
//! Values come from `CAMPSITE_*` environment variables, an optional
//! configuration file and command-line flags, in increasing precedence.

use std::net::SocketAddr;

use chrono::Duration;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use campsite::domain::{AppLinks, TokenTtls};

/// Shortest signing secret accepted in production.
pub const MIN_PRODUCTION_SECRET_BYTES: usize = 32;

const PRODUCTION_ENV: &str = "production";
const DEV_SECRET: &str = "campsite-local-development-signing-secret";

/// Runtime configuration for the HTTP server and its collaborators.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CAMPSITE")]
pub struct AppSettings {
    /// Socket address the server listens on.
    #[ortho_config(default = "0.0.0.0:8080".to_owned())]
    pub bind_addr: String,
    /// PostgreSQL URL. Without one the server keeps everything in memory.
    pub database_url: Option<String>,
    /// HMAC secret signing every token.
    pub jwt_secret: Option<String>,
    #[ortho_config(default = 15)]
    pub access_ttl_minutes: i64,
    #[ortho_config(default = 30)]
    pub admin_access_ttl_minutes: i64,
    #[ortho_config(default = 7)]
    pub refresh_ttl_days: i64,
    /// `production` enables secure cookies and strict secret checks.
    #[ortho_config(default = "local".to_owned())]
    pub app_env: String,
    /// Public URL of this API, used in verification links.
    #[ortho_config(default = "http://localhost:8080".to_owned())]
    pub app_url: String,
    /// URL of the web client, used in password reset links.
    #[ortho_config(default = "http://localhost:5173".to_owned())]
    pub frontend_url: String,
    #[ortho_config(default = "no-reply@campsite.local".to_owned())]
    pub mail_from: String,
    pub google_client_id: Option<String>,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_upload_preset: Option<String>,
    /// Nominatim base URL. Without one, addresses are never geocoded.
    pub nominatim_url: Option<String>,
    pub geocoder_user_agent: Option<String>,
    /// Forgot-password requests per client per five minutes.
    #[ortho_config(default = 3)]
    pub forgot_password_limit: u32,
    /// Login, register and reset requests per client per minute.
    #[ortho_config(default = 10)]
    pub auth_limit: u32,
}

/// Settings that cannot be turned into a running server.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid bind address {value:?}: {message}")]
    BindAddr { value: String, message: String },
    #[error("CAMPSITE_JWT_SECRET is required in production")]
    MissingSecret,
    #[error("CAMPSITE_JWT_SECRET must be at least {MIN_PRODUCTION_SECRET_BYTES} bytes in production")]
    WeakSecret,
    #[error("token lifetimes must be positive")]
    InvalidTtl,
}

impl AppSettings {
    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case(PRODUCTION_ENV)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
                value: self.bind_addr.clone(),
                message: err.to_string(),
            })
    }

    /// Signing secret. Outside production a missing secret falls back to a
    /// fixed development value.
    pub fn signing_secret(&self) -> Result<Vec<u8>, SettingsError> {
        match self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) if self.is_production() && secret.len() < MIN_PRODUCTION_SECRET_BYTES => {
                Err(SettingsError::WeakSecret)
            }
            Some(secret) => Ok(secret.as_bytes().to_vec()),
            None if self.is_production() => Err(SettingsError::MissingSecret),
            None => Ok(DEV_SECRET.as_bytes().to_vec()),
        }
    }

    pub fn token_ttls(&self) -> Result<TokenTtls, SettingsError> {
        if self.access_ttl_minutes <= 0
            || self.admin_access_ttl_minutes <= 0
            || self.refresh_ttl_days <= 0
        {
            return Err(SettingsError::InvalidTtl);
        }
        Ok(TokenTtls {
            access: Duration::minutes(self.access_ttl_minutes),
            admin_access: Duration::minutes(self.admin_access_ttl_minutes),
            refresh: Duration::days(self.refresh_ttl_days),
            ..TokenTtls::default()
        })
    }

    pub fn links(&self) -> AppLinks {
        AppLinks {
            app_url: self.app_url.trim_end_matches('/').to_owned(),
            frontend_url: self.frontend_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing and validation.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const KEYS: [&str; 6] = [
        "CAMPSITE_BIND_ADDR",
        "CAMPSITE_DATABASE_URL",
        "CAMPSITE_JWT_SECRET",
        "CAMPSITE_APP_ENV",
        "CAMPSITE_ACCESS_TTL_MINUTES",
        "CAMPSITE_AUTH_LIMIT",
    ];

    fn load(overrides: &[(&str, &str)]) -> AppSettings {
        let _guard = lock_env(KEYS.map(|key| {
            let value = overrides
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned());
            (key, value)
        }));
        AppSettings::load_from_iter([OsString::from("campsite")]).expect("settings should load")
    }

    #[rstest]
    fn defaults_describe_a_local_in_memory_server() {
        let settings = load(&[]);
        assert_eq!(settings.bind_addr, "0.0.0.0:8080");
        assert!(settings.database_url.is_none());
        assert!(!settings.is_production());
        assert_eq!(settings.auth_limit, 10);
        assert_eq!(settings.forgot_password_limit, 3);
        let ttls = settings.token_ttls().expect("ttls");
        assert_eq!(ttls.access, Duration::minutes(15));
        assert_eq!(ttls.admin_access, Duration::minutes(30));
        assert_eq!(ttls.refresh, Duration::days(7));
        assert!(settings.signing_secret().is_ok());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let settings = load(&[
            ("CAMPSITE_BIND_ADDR", "127.0.0.1:9000"),
            ("CAMPSITE_DATABASE_URL", "postgres://localhost/campsite"),
            ("CAMPSITE_ACCESS_TTL_MINUTES", "5"),
            ("CAMPSITE_AUTH_LIMIT", "20"),
        ]);
        assert_eq!(
            settings.socket_addr().expect("addr"),
            "127.0.0.1:9000".parse::<SocketAddr>().expect("literal")
        );
        assert_eq!(
            settings.database_url.as_deref(),
            Some("postgres://localhost/campsite")
        );
        assert_eq!(settings.auth_limit, 20);
        assert_eq!(
            settings.token_ttls().expect("ttls").access,
            Duration::minutes(5)
        );
    }

    #[rstest]
    #[case(None, Err(SettingsError::MissingSecret))]
    #[case(Some("short"), Err(SettingsError::WeakSecret))]
    #[case(Some("0123456789abcdef0123456789abcdef"), Ok(32))]
    fn production_requires_a_strong_secret(
        #[case] secret: Option<&str>,
        #[case] expected: Result<usize, SettingsError>,
    ) {
        let mut overrides = vec![("CAMPSITE_APP_ENV", "production")];
        if let Some(secret) = secret {
            overrides.push(("CAMPSITE_JWT_SECRET", secret));
        }
        let settings = load(&overrides);
        assert!(settings.is_production());
        assert_eq!(settings.signing_secret().map(|s| s.len()), expected);
    }

    #[rstest]
    fn bad_bind_addresses_are_reported() {
        let settings = load(&[("CAMPSITE_BIND_ADDR", "not-an-address")]);
        assert!(matches!(
            settings.socket_addr(),
            Err(SettingsError::BindAddr { .. })
        ));
    }

    #[rstest]
    fn links_drop_trailing_slashes() {
        let mut settings = load(&[]);
        settings.app_url = "https://api.example.com/".to_owned();
        assert_eq!(settings.links().app_url, "https://api.example.com");
    }
}
