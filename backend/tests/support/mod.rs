//! Shared helper utilities for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so the
//! app builder and request shorthands live here instead of being copied into
//! every suite.

#![allow(dead_code, reason = "each suite uses a different subset of helpers")]

use actix_http::Request;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, test, web};
use serde_json::Value;

use campsite::Trace;
use campsite::inbound::http::cookies::REFRESH_COOKIE;
use campsite::inbound::http::health::HealthState;
use campsite::inbound::http::state::HttpState;

/// Initialise the full route table over `state`.
pub async fn init_app(
    state: HttpState,
) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
    let health = web::Data::new(HealthState::new());
    health.mark_ready();
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(health)
            .wrap(Trace)
            .configure(campsite::inbound::http::configure),
    )
    .await
}

/// Status, JSON body (or `Null`) and refresh cookie of a response.
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub refresh: Option<Cookie<'static>>,
}

pub async fn send<S>(app: &S, req: Request) -> Reply
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = test::call_service(app, req).await;
    let status = res.status();
    let refresh = res
        .response()
        .cookies()
        .find(|cookie| cookie.name() == REFRESH_COOKIE)
        .map(Cookie::into_owned);
    let bytes = test::read_body(res).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply {
        status,
        body,
        refresh,
    }
}

/// `Authorization` header for an access token.
pub fn bearer(access_token: &Value) -> (actix_web::http::header::HeaderName, String) {
    (
        AUTHORIZATION,
        format!("Bearer {}", access_token.as_str().unwrap_or_default()),
    )
}
