pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod health;
pub mod imports;
pub mod input;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod rdf;
pub mod report;
pub mod server;
pub mod shapes;
pub mod shutdown;
pub mod state;
pub mod validation;

pub use config::{CliArgs, ServerConfig};
pub use error::{ERROR_METRICS, ErrorCode, ErrorMetrics, ValidatorError};
pub use logging::{LoggingConfig, init_logging, shutdown_telemetry};
pub use server::{build_router, validate_one};
pub use shutdown::{ShutdownConfig, ShutdownCoordinator};

use anyhow::Result;
use state::AppState;
use std::{future::IntoFuture, sync::Arc};
use tokio::net::TcpListener;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    config.ensure_resource_root()?;

    let state = Arc::new(AppState::new(config.clone())?);
    if state.domains().is_empty() {
        tracing::warn!(
            resource_root = %config.resource_root.display(),
            "no domain configurations found; every validation request will answer 404"
        );
    }

    let coordinator = Arc::new(ShutdownCoordinator::new(
        ShutdownConfig::default().with_grace_period(config.graceful_shutdown_timeout_secs),
    ));

    let listener = TcpListener::bind(config.http_bind_address).await?;
    tracing::info!(
        bind = %listener.local_addr()?,
        resource_root = %config.resource_root.display(),
        domains = state.domains().len(),
        "shacl validator listening"
    );

    let signal_coordinator = coordinator.clone();
    tokio::spawn(async move {
        signal_coordinator.wait_for_signal().await;
        signal_coordinator.initiate();
    });

    let server = axum::serve(listener, server::build_router(state))
        .with_graceful_shutdown(coordinator.token().cancelled_owned())
        .into_future();

    coordinator.run_until_stopped(server).await
}
