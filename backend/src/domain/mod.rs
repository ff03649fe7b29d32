//! Domain primitives, services and ports.
//!
//! Purpose: hold the credential lifecycle (token codec, session manager,
//! authorization guard) and the catalogue rules (ownership policy, privacy
//! scrubber) independent of HTTP and storage. Services receive their ports as
//! `Arc<dyn Port>` at construction time.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - AuthError: closed set of credential failures with its mapping table.
//! - TokenCodec, SessionManager, AuthGuard, AccountService, AdminService.
//! - CategoryService, PlacemarkService, ReviewService.

pub mod account;
pub mod admin;
pub mod auth;
pub mod auth_error;
pub mod category;
pub mod category_service;
pub mod credential_store;
pub mod credentials;
pub mod error;
pub mod guard;
mod ids;
pub mod placemark;
pub mod placemark_service;
pub mod policy;
pub mod ports;
pub mod privacy;
pub mod review;
pub mod review_service;
pub mod session;
pub mod tokens;
pub mod trace_id;
pub mod user;

pub use self::account::{AccountService, ProfileUpdate};
pub use self::admin::AdminService;
pub use self::auth::{
    LoginCredentials, LoginValidationError, NewPassword, PasswordPolicyError, Registration,
};
pub use self::auth_error::AuthError;
pub use self::category::{Category, CategoryId, NewCategory};
pub use self::category_service::CategoryService;
pub use self::credential_store::{CredentialStore, Passwords};
pub use self::credentials::{
    ConsumeOutcome, OneTimePurpose, OneTimeToken, RefreshTokenRecord, RotationOutcome,
};
pub use self::error::{Error, ErrorCode};
pub use self::guard::{AuthGuard, Identity, bearer_token};
pub use self::placemark::{
    Address, Coordinates, Placemark, PlacemarkChanges, PlacemarkDraft, PlacemarkId,
};
pub use self::placemark_service::PlacemarkService;
pub use self::privacy::HIDDEN_STREET;
pub use self::review::{Review, ReviewDraft, ReviewId, ReviewThread};
pub use self::review_service::ReviewService;
pub use self::session::{AppLinks, LoginOutcome, SessionManager, TokenPair};
pub use self::tokens::{TokenCodec, TokenError, TokenTtls};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    Email, GOOGLE_PROVIDER, OAuthLink, PasswordHash, Profile, PublicUser, Role, User, UserId,
    UserValidationError, normalize_email, title_case,
};

/// Convenient service result alias.
///
/// # Examples
/// ```
/// use campsite::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
