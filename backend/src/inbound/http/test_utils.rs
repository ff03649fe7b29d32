//! Test helpers for inbound HTTP components.

use actix_web::cookie::Cookie;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use super::health::HealthState;
use super::state::HttpState;
use crate::Trace;

/// Full route table over `state`, wrapped in the trace middleware.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let health = web::Data::new(HealthState::new());
    health.mark_ready();
    App::new()
        .app_data(web::Data::new(state))
        .app_data(health)
        .wrap(Trace)
        .configure(super::configure)
}

/// The refresh cookie set on `res`, if any.
pub fn refresh_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == super::cookies::REFRESH_COOKIE)
        .map(Cookie::into_owned)
}
