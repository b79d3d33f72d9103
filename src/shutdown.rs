//! Graceful shutdown
//!
//! On SIGINT or SIGTERM the coordinator cancels its token, which stops the
//! HTTP listener from accepting connections. In-flight validations then get
//! a bounded grace period to finish before the server future is dropped.
//! Dropping a request future releases its temporary content file, so a
//! forced stop still leaves nothing behind in the temp directory.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// How long in-flight requests may run once shutdown has started
    pub grace_period: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(45),
        }
    }
}

impl ShutdownConfig {
    pub fn with_grace_period(mut self, timeout_secs: u64) -> Self {
        self.grace_period = Duration::from_secs(timeout_secs);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ShutdownPhase {
    Running,
    /// No new connections; waiting for in-flight requests
    Draining,
    Complete,
    /// Grace period ran out with requests still in flight
    Forced,
}

pub struct ShutdownCoordinator {
    config: ShutdownConfig,
    phase: RwLock<ShutdownPhase>,
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            config,
            phase: RwLock::new(ShutdownPhase::Running),
            token: CancellationToken::new(),
        }
    }

    /// Cancelled once shutdown starts. Hand it to anything that must stop
    /// taking new work.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.read()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn initiate(&self) {
        if self.token.is_cancelled() {
            return;
        }
        *self.phase.write() = ShutdownPhase::Draining;
        info!(
            grace_secs = self.config.grace_period.as_secs(),
            "shutdown initiated, draining in-flight requests"
        );
        self.token.cancel();
    }

    /// Resolves on SIGINT or SIGTERM. A signal whose handler cannot be
    /// installed is logged and never fires.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                error!(%error, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(error) => {
                    error!(%error, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("received SIGINT"),
            _ = terminate => info!("received SIGTERM"),
        }
    }

    /// Drives `server` until it finishes on its own or shutdown starts, then
    /// gives it the grace period to drain.
    pub async fn run_until_stopped<F, E>(&self, server: F) -> Result<()>
    where
        F: Future<Output = Result<(), E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => {
                *self.phase.write() = ShutdownPhase::Complete;
                return result.context("HTTP server stopped unexpectedly");
            }
            _ = self.token.cancelled() => {}
        }

        match timeout(self.config.grace_period, &mut server).await {
            Ok(result) => {
                *self.phase.write() = ShutdownPhase::Complete;
                info!("graceful shutdown complete");
                result.context("HTTP server failed while draining")
            }
            Err(_) => {
                *self.phase.write() = ShutdownPhase::Forced;
                warn!(
                    grace_secs = self.config.grace_period.as_secs(),
                    "grace period elapsed, dropping in-flight requests"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn server_finishing_on_its_own_completes() {
        let coordinator = ShutdownCoordinator::new(ShutdownConfig::default());
        coordinator
            .run_until_stopped(async { Ok::<(), io::Error>(()) })
            .await
            .expect("run");
        assert_eq!(coordinator.phase(), ShutdownPhase::Complete);
        assert!(!coordinator.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn stuck_server_is_forced_after_grace_period() {
        let coordinator = ShutdownCoordinator::new(ShutdownConfig {
            grace_period: Duration::from_millis(20),
        });
        coordinator.initiate();
        assert_eq!(coordinator.phase(), ShutdownPhase::Draining);

        coordinator
            .run_until_stopped(std::future::pending::<Result<(), io::Error>>())
            .await
            .expect("forced stop is not an error");
        assert_eq!(coordinator.phase(), ShutdownPhase::Forced);
    }

    #[tokio::test]
    async fn draining_server_completes_within_grace_period() {
        let coordinator = ShutdownCoordinator::new(ShutdownConfig::default());
        let token = coordinator.token();
        coordinator.initiate();

        coordinator
            .run_until_stopped(async move {
                token.cancelled().await;
                Ok::<(), io::Error>(())
            })
            .await
            .expect("run");
        assert_eq!(coordinator.phase(), ShutdownPhase::Complete);
    }

    #[test]
    fn phase_names() {
        assert_eq!(ShutdownPhase::Draining.to_string(), "draining");
        assert_eq!(
            ShutdownConfig::default().with_grace_period(5).grace_period,
            Duration::from_secs(5)
        );
    }
}
