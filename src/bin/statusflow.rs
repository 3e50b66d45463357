//! Serves ShotGrid webhooks over HTTP.
//!
//! Usage:
//!
//! ```text
//! statusflow
//! ```
//!
//! All settings come from the environment (see [`statusflow::config`]). The
//! mapping document is loaded and validated before the listener binds, so a
//! broken document stops the process instead of serving requests.

use mockable::DefaultClock;
use statusflow::{
    config::{ServiceConfig, load_mapping_table},
    observability::init_logging,
    propagation::adapters::shotgrid::ShotgridTracker,
    webhook::{adapters::http::router, domain::SignatureVerifier, services::WebhookService},
};
use std::sync::Arc;
use thiserror::Error;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] statusflow::config::ConfigError),
    #[error("status mapping error: {0}")]
    Mapping(#[from] statusflow::propagation::domain::MappingConfigError),
    #[error("webhook secret rejected: {0}")]
    Secret(#[from] statusflow::webhook::domain::AuthenticationError),
    #[error("tracking service client failed to initialise: {0}")]
    Tracker(#[from] statusflow::propagation::ports::TrackerError),
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("server terminated: {0}")]
    Serve(#[source] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    run().await.map_err(|err| {
        tracing::error!(error = %err, "statusflow failed");
        Box::new(err) as BoxError
    })
}

async fn run() -> Result<(), StartupError> {
    let config = ServiceConfig::from_env()?;
    init_logging(config.log_format());
    tracing::info!(?config, "starting statusflow");

    let table = Arc::new(load_mapping_table(config.mapping_path())?);
    tracing::info!(
        path = %config.mapping_path(),
        rules = table.rules().count(),
        fanout_rules = table.fanout_rules().count(),
        "status mapping loaded"
    );

    let verifier = SignatureVerifier::new(config.secret_token())?;
    let tracker = Arc::new(ShotgridTracker::new(config.shotgrid_settings())?);
    let mut service = WebhookService::new(verifier, table, tracker, Arc::new(DefaultClock));
    if let Some(timeout) = config.dispatch_timeout() {
        service = service.with_dispatch_timeout(timeout);
    }

    let listener = tokio::net::TcpListener::bind(config.bind())
        .await
        .map_err(StartupError::Bind)?;
    tracing::info!(address = %config.bind(), "listening for webhooks");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;
    tracing::info!("statusflow stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
