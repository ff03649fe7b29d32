//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`). Only
//! compiled for tests or with the `test-support` feature.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    Geocoder, GeocoderError, GoogleProfile, ImageHost, ImageHostError, MailError, MailMessage,
    MailSender, OAuthVerifier, OAuthVerifierError, PasswordHashError, PasswordHasher,
};
use crate::domain::{
    AccountService, Address, AdminService, AppLinks, AuthGuard, Category, CategoryId,
    CategoryService, Coordinates, CredentialStore, Email, LoginCredentials, PasswordHash,
    Placemark, PlacemarkId, PlacemarkService, Passwords, Profile, ReviewService, Role,
    SessionManager, TokenCodec, TokenPair, TokenTtls, User, UserId,
};
use crate::inbound::http::cookies::RefreshCookie;
use crate::inbound::http::rate_limit::AuthRateLimits;
use crate::inbound::http::state::{HttpServices, HttpState};
use crate::outbound::memory::InMemoryStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("test double mutex poisoned"),
    }
}

/// Clock whose time only moves when a test says so.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Clock fixed at 2024-06-01T12:00:00Z.
    pub fn fixed() -> Self {
        match Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single() {
            Some(now) => Self::new(now),
            None => panic!("fixed clock instant is ambiguous"),
        }
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Reversible "hash" so tests avoid Argon2's cost.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextHasher;

const PLAINTEXT_PREFIX: &str = "plain$";

impl PasswordHasher for PlaintextHasher {
    fn hash(&self, password: &str) -> Result<PasswordHash, PasswordHashError> {
        Ok(PasswordHash::new(format!("{PLAINTEXT_PREFIX}{password}")))
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, PasswordHashError> {
        let stored = hash
            .as_str()
            .strip_prefix(PLAINTEXT_PREFIX)
            .ok_or_else(|| PasswordHashError::malformed("missing plaintext prefix"))?;
        Ok(stored == password)
    }
}

/// Mail sender that keeps every message, optionally failing instead.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    failing: Mutex<bool>,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        lock(&self.sent).clone()
    }

    /// Token embedded in the last link sent to `to`.
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        lock(&self.sent)
            .iter()
            .rev()
            .find(|m| m.to == to)
            .and_then(|m| token_from_html(&m.html))
    }
}

fn token_from_html(html: &str) -> Option<String> {
    let start = html.find("token=")? + "token=".len();
    let rest = &html[start..];
    let end = rest.find('"').unwrap_or(rest.len());
    Some(rest[..end].to_owned())
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if *lock(&self.failing) {
            return Err(MailError::delivery("recording mailer set to fail"));
        }
        lock(&self.sent).push(message.clone());
        Ok(())
    }
}

/// OAuth verifier answering from a fixed table of ID tokens.
#[derive(Default)]
pub struct StubOAuthVerifier {
    profiles: Mutex<HashMap<String, GoogleProfile>>,
}

impl StubOAuthVerifier {
    pub fn accept(&self, id_token: &str, profile: GoogleProfile) {
        lock(&self.profiles).insert(id_token.to_owned(), profile);
    }
}

#[async_trait]
impl OAuthVerifier for StubOAuthVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleProfile, OAuthVerifierError> {
        lock(&self.profiles)
            .get(id_token)
            .cloned()
            .ok_or_else(|| OAuthVerifierError::rejected("unknown test token"))
    }
}

/// Geocoder returning the same answer for every address.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticGeocoder(pub Option<Coordinates>);

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn coordinates(&self, _address: &str) -> Result<Option<Coordinates>, GeocoderError> {
        Ok(self.0)
    }
}

/// Image host that hands out sequential URLs.
#[derive(Default)]
pub struct CountingImageHost(Mutex<u32>);

#[async_trait]
impl ImageHost for CountingImageHost {
    async fn upload(&self, _bytes: Vec<u8>) -> Result<String, ImageHostError> {
        let mut count = lock(&self.0);
        *count += 1;
        Ok(format!("https://images.test/{count}.jpg"))
    }
}

pub const TEST_SECRET: &[u8] = b"test-signing-secret-with-enough-bytes";
pub const TEST_PASSWORD: &str = "Sup3r$ecret";

/// Every service wired onto one in-memory store and one mutable clock.
pub struct Harness {
    pub store: InMemoryStore,
    pub clock: Arc<MutableClock>,
    pub mailer: Arc<RecordingMailer>,
    pub oauth: Arc<StubOAuthVerifier>,
    pub codec: TokenCodec,
    pub sessions: SessionManager,
    pub guard: AuthGuard,
    pub accounts: AccountService,
    pub admin: AdminService,
    pub categories: CategoryService,
    pub placemarks: PlacemarkService,
    pub reviews: ReviewService,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_geocoder(StaticGeocoder(Some(Coordinates {
            latitude: 47.0,
            longitude: 8.0,
        })))
    }

    pub fn with_geocoder(geocoder: impl Geocoder + 'static) -> Self {
        let store = InMemoryStore::new();
        let clock = Arc::new(MutableClock::fixed());
        let mailer = Arc::new(RecordingMailer::default());
        let oauth = Arc::new(StubOAuthVerifier::default());
        let shared: Arc<InMemoryStore> = Arc::new(store.clone());
        let credentials = CredentialStore {
            users: shared.clone(),
            refresh_tokens: shared.clone(),
            one_time_tokens: shared.clone(),
            unit_of_work: shared.clone(),
        };
        let codec = TokenCodec::new(TEST_SECRET, TokenTtls::default(), clock.clone());
        let passwords = Passwords::new(Arc::new(PlaintextHasher));
        let links = AppLinks {
            app_url: "http://api.test".to_owned(),
            frontend_url: "http://app.test".to_owned(),
        };
        let sessions = SessionManager::new(
            credentials.clone(),
            codec.clone(),
            passwords.clone(),
            mailer.clone(),
            links.clone(),
        );
        let guard = AuthGuard::new(codec.clone(), shared.clone(), shared.clone());
        let accounts = AccountService::new(
            credentials,
            sessions.clone(),
            passwords,
            mailer.clone(),
            oauth.clone(),
            links,
        );
        Self {
            admin: AdminService::new(shared.clone(), clock.clone()),
            categories: CategoryService::new(shared.clone(), clock.clone()),
            placemarks: PlacemarkService::new(
                shared.clone(),
                shared.clone(),
                Arc::new(geocoder),
                Arc::new(CountingImageHost::default()),
                clock.clone(),
            ),
            reviews: ReviewService::new(shared.clone(), shared, clock.clone()),
            store,
            clock,
            mailer,
            oauth,
            codec,
            sessions,
            guard,
            accounts,
        }
    }

    /// Insert a user with [`TEST_PASSWORD`] directly into the store.
    pub async fn seed_user(&self, email: &str, role: Role, verified: bool) -> User {
        use crate::domain::ports::UserRepository;

        let now = self.clock.utc();
        let user = User {
            id: UserId::random(),
            email: Email::parse(email).unwrap_or_else(|e| panic!("seed email {email}: {e}")),
            password_hash: Some(PasswordHash::new(format!("{PLAINTEXT_PREFIX}{TEST_PASSWORD}"))),
            role,
            email_verified_at: verified.then_some(now),
            profile: Profile::from_names("Test", "Camper")
                .unwrap_or_else(|e| panic!("seed profile: {e}")),
            oauth: None,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = UserRepository::insert(&self.store, &user).await {
            panic!("seed user {email}: {err}");
        }
        user
    }

    /// Insert a category straight into the store.
    pub async fn seed_category(&self, name: &str) -> Category {
        use crate::domain::ports::CategoryRepository;

        let category = Category {
            id: CategoryId::random(),
            name: name.to_owned(),
            description: None,
            created_by: None,
            created_at: self.clock.utc(),
        };
        if let Err(err) = CategoryRepository::insert(&self.store, &category).await {
            panic!("seed category {name}: {err}");
        }
        category
    }

    /// Insert a placemark owned by `owner` at "Forest Road 12, 8000 Zurich".
    pub async fn seed_placemark(
        &self,
        owner: &User,
        category: &Category,
        is_public: bool,
    ) -> Placemark {
        use crate::domain::ports::PlacemarkRepository;

        let now = self.clock.utc();
        let placemark = Placemark {
            id: PlacemarkId::random(),
            name: "Lakeside".to_owned(),
            description: Some("Quiet spot".to_owned()),
            address: Address::try_new("Forest Road", "12", "8000", "Zurich", "Switzerland")
                .unwrap_or_else(|e| panic!("seed address: {e}")),
            coordinates: Coordinates {
                latitude: 47.3,
                longitude: 8.5,
            },
            image_url: None,
            is_public,
            view_count: 0,
            owner_id: owner.id,
            category_id: category.id,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = PlacemarkRepository::insert(&self.store, &placemark).await {
            panic!("seed placemark: {err}");
        }
        placemark
    }

    /// Log a seeded user in with [`TEST_PASSWORD`].
    pub async fn tokens_for(&self, email: &str) -> TokenPair {
        let credentials = LoginCredentials::try_from_parts(email, TEST_PASSWORD)
            .unwrap_or_else(|e| panic!("credentials for {email}: {e}"));
        match self.sessions.login(&credentials).await {
            Ok(outcome) => outcome.tokens,
            Err(err) => panic!("login {email}: {err}"),
        }
    }

    /// `Authorization` header value for a seeded user.
    pub async fn bearer_for(&self, email: &str) -> String {
        format!("Bearer {}", self.tokens_for(email).await.access_token)
    }

    /// HTTP state over the same services, without rate limits.
    pub fn http_state(&self) -> HttpState {
        self.http_state_with_limits(AuthRateLimits::disabled())
    }

    pub fn http_state_with_limits(&self, limits: AuthRateLimits) -> HttpState {
        HttpState::new(
            HttpServices {
                sessions: self.sessions.clone(),
                guard: self.guard.clone(),
                accounts: self.accounts.clone(),
                admin: self.admin.clone(),
                categories: self.categories.clone(),
                placemarks: self.placemarks.clone(),
                reviews: self.reviews.clone(),
            },
            RefreshCookie::new(false),
            limits,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn plaintext_hasher_round_trips() {
        let hash = PlaintextHasher.hash("pw").expect("hash");
        assert!(PlaintextHasher.verify("pw", &hash).expect("verify"));
        assert!(!PlaintextHasher.verify("other", &hash).expect("verify"));
    }

    #[rstest]
    fn extracts_token_from_link() {
        let html = r#"<a href="http://x/reset?token=abc.def">Reset</a>"#;
        assert_eq!(token_from_html(html).as_deref(), Some("abc.def"));
    }
}
