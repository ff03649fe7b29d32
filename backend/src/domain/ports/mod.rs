//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod category_repository;
mod credential_unit_of_work;
mod geocoder;
mod image_host;
mod mail_sender;
mod oauth_verifier;
mod one_time_token_repository;
mod password_hasher;
mod placemark_repository;
mod refresh_token_repository;
mod review_repository;
mod store_error;
mod user_repository;

pub use category_repository::CategoryRepository;
#[cfg(test)]
pub use category_repository::MockCategoryRepository;
pub use credential_unit_of_work::CredentialUnitOfWork;
#[cfg(test)]
pub use credential_unit_of_work::MockCredentialUnitOfWork;
#[cfg(test)]
pub use geocoder::MockGeocoder;
pub use geocoder::{FixtureGeocoder, Geocoder, GeocoderError};
#[cfg(test)]
pub use image_host::MockImageHost;
pub use image_host::{DisabledImageHost, ImageHost, ImageHostError};
#[cfg(test)]
pub use mail_sender::MockMailSender;
pub use mail_sender::{MailError, MailMessage, MailSender};
#[cfg(test)]
pub use oauth_verifier::MockOAuthVerifier;
pub use oauth_verifier::{DisabledOAuthVerifier, GoogleProfile, OAuthVerifier, OAuthVerifierError};
#[cfg(test)]
pub use one_time_token_repository::MockOneTimeTokenRepository;
pub use one_time_token_repository::OneTimeTokenRepository;
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use placemark_repository::MockPlacemarkRepository;
pub use placemark_repository::PlacemarkRepository;
#[cfg(test)]
pub use refresh_token_repository::MockRefreshTokenRepository;
pub use refresh_token_repository::RefreshTokenRepository;
#[cfg(test)]
pub use review_repository::MockReviewRepository;
pub use review_repository::ReviewRepository;
pub use store_error::StoreError;
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::UserRepository;
