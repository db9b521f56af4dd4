use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{app_state::AppState, config};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Builds the shared state, attaches it to the router and serves until the
/// process is terminated.
pub async fn bootstrap(service_name: &str, app: Router<AppState>) -> Result<()> {
    let config = config::load()?;
    let state = AppState::init(&config).await?;

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("{} listening on {}", service_name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind listener")?;
    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;
    Ok(())
}
