//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: mutex-guarded store for development and tests
//! - **security**: Argon2id password hashing
//! - **mail**, **geocoding**, **images**, **google**: collaborator services
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod geocoding;
pub mod google;
mod http_support;
pub mod images;
pub mod mail;
pub mod memory;
pub mod persistence;
pub mod security;
