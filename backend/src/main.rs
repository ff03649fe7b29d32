//! Backend entry-point: loads settings, connects the store and serves the
//! REST API.

mod server;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use campsite::inbound::http::health::HealthState;
use server::{AppSettings, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().wrap_err("failed to load CAMPSITE settings")?;
    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, &settings)
        .await
        .wrap_err("failed to start server")?;
    server.await.wrap_err("server terminated abnormally")
}
