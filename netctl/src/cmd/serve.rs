//! `netctl serve`: run the controller with its HTTP API.
//!
//! Restores the last provider configuration, connects, then serves the API
//! until SIGTERM/SIGINT. A watcher keeps the network status current and every
//! provider change is written back to the state file.

use std::net::SocketAddr;
use std::path::Path;

use axum::http::Method;
use dotenvy::dotenv;
use tower_http::cors;

use crate::cmd::controller_from_config;
use crate::config::load_config;
use crate::error::Error;
use crate::network::watcher;
use crate::routes;
use crate::shutdown::Shutdown;
use crate::telemetry::{self, Telemetry};

/// Execute the `serve` command.
///
/// A provider that fails to connect at start-up is logged, not fatal; the API
/// can switch to another network.
///
/// # Errors
///
/// Returns an error if configuration loading, signal registration or server
/// binding fails.
pub async fn run(config_path: &Path) -> Result<(), Error> {
    dotenv().ok();
    let config = load_config(config_path)?;
    let _telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_log_level(&config.telemetry.log_level)
        .with_json(config.telemetry.json)
        .register();

    let shutdown =
        Shutdown::listen().map_err(|e| Error::Server(format!("signal registration failed: {e}")))?;

    let (controller, store) = controller_from_config(&config);
    shutdown.spawn(store.follow(controller.watch_provider(), shutdown.token()));
    shutdown.track(watcher::spawn(controller.clone(), shutdown.token()));

    if let Err(err) = controller.initialize_provider(config.provider_params()).await {
        tracing::error!(error = %err, "failed to connect the configured provider");
    }

    let app = routes::routes()
        .with_state(controller)
        .layer(telemetry::http_tracing())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("failed to bind {addr}: {e}")))?;
    tracing::info!(%addr, "listening");

    let token = shutdown.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    shutdown.trigger();
    shutdown.drain().await;
    tracing::info!("shut down");
    Ok(())
}
