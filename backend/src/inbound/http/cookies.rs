//! Refresh-token cookie handling.
//!
//! The refresh token never appears in a response body. It travels in an
//! `HttpOnly` cookie scoped to the `/auth` subtree so only the auth endpoints
//! ever see it.

use actix_web::HttpRequest;
use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};

pub const REFRESH_COOKIE: &str = "refresh_token";
const REFRESH_COOKIE_PATH: &str = "/auth";
const REFRESH_COOKIE_MAX_AGE_DAYS: i64 = 7;

/// Attributes for the refresh cookie, fixed at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCookie {
    production: bool,
}

impl RefreshCookie {
    /// `Secure` and `SameSite=Strict` in production; `Lax` over plain HTTP
    /// otherwise.
    pub fn new(production: bool) -> Self {
        Self { production }
    }

    fn same_site(self) -> SameSite {
        if self.production {
            SameSite::Strict
        } else {
            SameSite::Lax
        }
    }

    fn base(self, value: String) -> Cookie<'static> {
        Cookie::build(REFRESH_COOKIE, value)
            .http_only(true)
            .secure(self.production)
            .same_site(self.same_site())
            .path(REFRESH_COOKIE_PATH)
            .finish()
    }

    /// Cookie carrying a freshly issued refresh token.
    pub fn issue(self, token: &str) -> Cookie<'static> {
        let mut cookie = self.base(token.to_owned());
        cookie.set_max_age(Duration::days(REFRESH_COOKIE_MAX_AGE_DAYS));
        cookie
    }

    /// Expired cookie with matching attributes so browsers drop the token.
    pub fn clear(self) -> Cookie<'static> {
        let mut cookie = self.base(String::new());
        cookie.make_removal();
        cookie
    }
}

/// Refresh token presented by the client, if any.
pub fn presented_refresh_token(req: &HttpRequest) -> Option<String> {
    req.cookie(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    #[rstest]
    #[case(true, SameSite::Strict, Some(true))]
    #[case(false, SameSite::Lax, Some(false))]
    fn issued_cookie_follows_the_environment(
        #[case] production: bool,
        #[case] same_site: SameSite,
        #[case] secure: Option<bool>,
    ) {
        let cookie = RefreshCookie::new(production).issue("abc");
        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), secure);
        assert_eq!(cookie.same_site(), Some(same_site));
        assert_eq!(cookie.path(), Some("/auth"));
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
    }

    #[rstest]
    fn cleared_cookie_keeps_path_and_expires() {
        let cookie = RefreshCookie::new(true).clear();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/auth"));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[rstest]
    fn reads_the_presented_token() {
        let req = TestRequest::default()
            .cookie(Cookie::new(REFRESH_COOKIE, "tok"))
            .to_http_request();
        assert_eq!(presented_refresh_token(&req).as_deref(), Some("tok"));
    }

    #[rstest]
    fn blank_cookie_counts_as_absent() {
        let req = TestRequest::default()
            .cookie(Cookie::new(REFRESH_COOKIE, ""))
            .to_http_request();
        assert_eq!(presented_refresh_token(&req), None);
    }
}
