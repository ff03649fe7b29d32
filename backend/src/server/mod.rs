//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::AppSettings;
pub use state_builders::StartupError;

use state_builders::build_http_state;

use std::time::Duration;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;

use campsite::Trace;
use campsite::inbound::http::configure;
use campsite::inbound::http::health::HealthState;
use campsite::inbound::http::state::HttpState;

const RATE_LIMIT_PRUNE_PERIOD: Duration = Duration::from_secs(60);

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .configure(configure)
}

/// Construct the Actix HTTP server described by `settings`.
///
/// Readiness flips once the stores are connected and the socket is bound.
///
/// # Errors
///
/// Returns [`StartupError`] when the settings are unusable, the database
/// cannot be reached or the socket cannot be bound.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    settings: &AppSettings,
) -> Result<Server, StartupError> {
    let bind_addr = settings.socket_addr()?;
    let http_state = web::Data::new(build_http_state(settings).await?);
    // Detached; it ends with the runtime.
    drop(http_state.limits.spawn_pruning(RATE_LIMIT_PRUNE_PERIOD));

    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || build_app(server_health_state.clone(), http_state.clone()))
        .bind(bind_addr)
        .map_err(|err| StartupError::Bind {
            addr: bind_addr,
            source: err,
        })?
        .run();

    health_state.mark_ready();
    info!(%bind_addr, production = settings.is_production(), "server listening");
    Ok(server)
}
