//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain store ports backed by PostgreSQL
//! through `diesel-async` with `bb8` pooling.
//!
//! - Repository implementations only translate between Diesel rows and domain
//!   types; no business rules live here.
//! - Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//!   private to this module.
//! - Every failure is mapped into `StoreError`; unique violations keep the
//!   constraint name.
//!
//! # Example
//!
//! ```no_run
//! use campsite::outbound::persistence::{DbPool, DieselUserRepository, PoolConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/campsite")).await?;
//! let users = DieselUserRepository::new(pool);
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

mod diesel_category_repository;
mod diesel_credential_repository;
mod diesel_placemark_repository;
mod diesel_review_repository;
mod diesel_user_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_category_repository::DieselCategoryRepository;
pub use diesel_credential_repository::{
    DieselCredentialUnitOfWork, DieselOneTimeTokenRepository, DieselRefreshTokenRepository,
};
pub use diesel_placemark_repository::DieselPlacemarkRepository;
pub use diesel_review_repository::DieselReviewRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::run_migrations;
pub use pool::{DbPool, PoolConfig, PoolError};
