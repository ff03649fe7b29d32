//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable against the in-memory store.

use crate::domain::{
    AccountService, AdminService, AuthGuard, CategoryService, PlacemarkService, ReviewService,
    SessionManager,
};

use super::cookies::RefreshCookie;
use super::rate_limit::AuthRateLimits;

/// Parameter object bundling the domain services used by handlers.
#[derive(Clone)]
pub struct HttpServices {
    pub sessions: SessionManager,
    pub guard: AuthGuard,
    pub accounts: AccountService,
    pub admin: AdminService,
    pub categories: CategoryService,
    pub placemarks: PlacemarkService,
    pub reviews: ReviewService,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub sessions: SessionManager,
    pub guard: AuthGuard,
    pub accounts: AccountService,
    pub admin: AdminService,
    pub categories: CategoryService,
    pub placemarks: PlacemarkService,
    pub reviews: ReviewService,
    pub refresh_cookie: RefreshCookie,
    pub limits: AuthRateLimits,
}

impl HttpState {
    pub fn new(services: HttpServices, refresh_cookie: RefreshCookie, limits: AuthRateLimits) -> Self {
        let HttpServices {
            sessions,
            guard,
            accounts,
            admin,
            categories,
            placemarks,
            reviews,
        } = services;
        Self {
            sessions,
            guard,
            accounts,
            admin,
            categories,
            placemarks,
            reviews,
            refresh_cookie,
            limits,
        }
    }
}
