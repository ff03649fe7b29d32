//! Builders wiring settings, stores and collaborators into [`HttpState`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mockable::{Clock, DefaultClock};
use reqwest::Url;
use thiserror::Error;
use tracing::{info, warn};

use campsite::domain::ports::{
    CategoryRepository, CredentialUnitOfWork, DisabledImageHost, DisabledOAuthVerifier,
    FixtureGeocoder, Geocoder, ImageHost, MailSender, OAuthVerifier, OneTimeTokenRepository,
    PlacemarkRepository, RefreshTokenRepository, ReviewRepository, UserRepository,
};
use campsite::domain::{
    AccountService, AdminService, AuthGuard, CategoryService, CredentialStore, Passwords,
    PlacemarkService, ReviewService, SessionManager, TokenCodec,
};
use campsite::inbound::http::cookies::RefreshCookie;
use campsite::inbound::http::rate_limit::AuthRateLimits;
use campsite::inbound::http::state::{HttpServices, HttpState};
use campsite::outbound::geocoding::NominatimGeocoder;
use campsite::outbound::google::GoogleTokenVerifier;
use campsite::outbound::images::CloudinaryImageHost;
use campsite::outbound::mail::LoggingMailSender;
use campsite::outbound::memory::InMemoryStore;
use campsite::outbound::persistence::{
    DbPool, DieselCategoryRepository, DieselCredentialUnitOfWork, DieselOneTimeTokenRepository,
    DieselPlacemarkRepository, DieselRefreshTokenRepository, DieselReviewRepository,
    DieselUserRepository, PoolConfig, run_migrations,
};
use campsite::outbound::security::Argon2Hasher;

use super::config::{AppSettings, SettingsError};

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures while assembling the application state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("database unavailable: {0}")]
    Database(String),
    #[error("{collaborator} adapter could not be built: {message}")]
    Adapter {
        collaborator: &'static str,
        message: String,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

fn adapter_error(collaborator: &'static str, err: impl ToString) -> StartupError {
    StartupError::Adapter {
        collaborator,
        message: err.to_string(),
    }
}

/// Every store port behind one backend.
struct Stores {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    one_time_tokens: Arc<dyn OneTimeTokenRepository>,
    unit_of_work: Arc<dyn CredentialUnitOfWork>,
    categories: Arc<dyn CategoryRepository>,
    placemarks: Arc<dyn PlacemarkRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl Stores {
    fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            refresh_tokens: store.clone(),
            one_time_tokens: store.clone(),
            unit_of_work: store.clone(),
            categories: store.clone(),
            placemarks: store.clone(),
            reviews: store,
        }
    }

    fn postgres(pool: &DbPool) -> Self {
        Self {
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            refresh_tokens: Arc::new(DieselRefreshTokenRepository::new(pool.clone())),
            one_time_tokens: Arc::new(DieselOneTimeTokenRepository::new(pool.clone())),
            unit_of_work: Arc::new(DieselCredentialUnitOfWork::new(pool.clone())),
            categories: Arc::new(DieselCategoryRepository::new(pool.clone())),
            placemarks: Arc::new(DieselPlacemarkRepository::new(pool.clone())),
            reviews: Arc::new(DieselReviewRepository::new(pool.clone())),
        }
    }

    async fn connect(settings: &AppSettings) -> Result<Self, StartupError> {
        let Some(url) = settings.database_url.as_deref() else {
            warn!("no database configured; using the in-memory store");
            return Ok(Self::in_memory());
        };
        run_migrations(url)
            .await
            .map_err(|err| StartupError::Database(err.to_string()))?;
        let pool = DbPool::new(PoolConfig::new(url))
            .await
            .map_err(|err| StartupError::Database(err.to_string()))?;
        info!("connected to PostgreSQL");
        Ok(Self::postgres(&pool))
    }
}

/// Third-party collaborators, falling back to inert ones when unconfigured.
struct Collaborators {
    mail: Arc<dyn MailSender>,
    geocoder: Arc<dyn Geocoder>,
    images: Arc<dyn ImageHost>,
    oauth: Arc<dyn OAuthVerifier>,
}

impl Collaborators {
    fn from_settings(settings: &AppSettings) -> Result<Self, StartupError> {
        let mail: Arc<dyn MailSender> = Arc::new(LoggingMailSender::new(
            settings.mail_from.clone(),
            !settings.is_production(),
        ));

        let geocoder: Arc<dyn Geocoder> = match settings.nominatim_url.as_deref() {
            Some(raw) => {
                let base = Url::parse(raw).map_err(|err| adapter_error("geocoder", err))?;
                let geocoder = NominatimGeocoder::new(&base, OUTBOUND_TIMEOUT)
                    .map_err(|err| adapter_error("geocoder", err))?;
                match settings.geocoder_user_agent.as_deref() {
                    Some(agent) => Arc::new(geocoder.with_user_agent(agent)),
                    None => Arc::new(geocoder),
                }
            }
            None => {
                warn!("geocoding disabled; placemarks need explicit coordinates");
                Arc::new(FixtureGeocoder)
            }
        };

        let images: Arc<dyn ImageHost> = match (
            settings.cloudinary_cloud_name.as_deref(),
            settings.cloudinary_upload_preset.as_deref(),
        ) {
            (Some(cloud), Some(preset)) => Arc::new(
                CloudinaryImageHost::new(cloud, preset, OUTBOUND_TIMEOUT)
                    .map_err(|err| adapter_error("image host", err))?,
            ),
            _ => {
                warn!("image uploads disabled");
                Arc::new(DisabledImageHost)
            }
        };

        let oauth: Arc<dyn OAuthVerifier> = match settings.google_client_id.as_deref() {
            Some(client_id) => Arc::new(
                GoogleTokenVerifier::new(client_id, OUTBOUND_TIMEOUT)
                    .map_err(|err| adapter_error("google", err))?,
            ),
            None => {
                warn!("Google sign-in disabled");
                Arc::new(DisabledOAuthVerifier)
            }
        };

        Ok(Self {
            mail,
            geocoder,
            images,
            oauth,
        })
    }
}

fn build_services(
    settings: &AppSettings,
    stores: Stores,
    collaborators: Collaborators,
) -> Result<HttpServices, StartupError> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let codec = TokenCodec::new(
        &settings.signing_secret()?,
        settings.token_ttls()?,
        clock.clone(),
    );
    let passwords = Passwords::new(Arc::new(Argon2Hasher::new()));
    let links = settings.links();
    let credentials = CredentialStore {
        users: stores.users.clone(),
        refresh_tokens: stores.refresh_tokens.clone(),
        one_time_tokens: stores.one_time_tokens,
        unit_of_work: stores.unit_of_work,
    };

    let sessions = SessionManager::new(
        credentials.clone(),
        codec.clone(),
        passwords.clone(),
        collaborators.mail.clone(),
        links.clone(),
    );
    let guard = AuthGuard::new(codec, stores.users.clone(), stores.refresh_tokens);
    let accounts = AccountService::new(
        credentials,
        sessions.clone(),
        passwords,
        collaborators.mail,
        collaborators.oauth,
        links,
    );

    Ok(HttpServices {
        sessions,
        guard,
        accounts,
        admin: AdminService::new(stores.users, clock.clone()),
        categories: CategoryService::new(stores.categories.clone(), clock.clone()),
        placemarks: PlacemarkService::new(
            stores.placemarks.clone(),
            stores.categories,
            collaborators.geocoder,
            collaborators.images,
            clock.clone(),
        ),
        reviews: ReviewService::new(stores.reviews, stores.placemarks, clock),
    })
}

/// Connect the stores and assemble the HTTP state described by `settings`.
pub async fn build_http_state(settings: &AppSettings) -> Result<HttpState, StartupError> {
    let collaborators = Collaborators::from_settings(settings)?;
    let stores = Stores::connect(settings).await?;
    let services = build_services(settings, stores, collaborators)?;
    Ok(HttpState::new(
        services,
        RefreshCookie::new(settings.is_production()),
        AuthRateLimits::new(settings.auth_limit, settings.forgot_password_limit),
    ))
}
