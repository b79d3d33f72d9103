use crate::config::ServerConfig;
use crate::domain::DomainRegistry;
use crate::engine::{ConstraintEngine, CoreShaclEngine};
use crate::input::ContentFetcher;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Process-wide state shared by every request handler. Built once at
/// startup and never mutated afterwards.
pub struct AppState {
    config: Arc<ServerConfig>,
    domains: Arc<DomainRegistry>,
    engine: Arc<dyn ConstraintEngine>,
    fetcher: ContentFetcher,
}

impl AppState {
    /// Loads the domain registry and wires the bundled engine.
    pub fn new(config: Arc<ServerConfig>) -> Result<Self> {
        let domains = Arc::new(DomainRegistry::load(&config)?);
        Self::with_parts(config, domains, Arc::new(CoreShaclEngine))
    }

    pub fn with_parts(
        config: Arc<ServerConfig>,
        domains: Arc<DomainRegistry>,
        engine: Arc<dyn ConstraintEngine>,
    ) -> Result<Self> {
        let fetcher = ContentFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?
            .with_max_bytes(config.max_fetch_bytes);
        Ok(Self {
            config,
            domains,
            engine,
            fetcher,
        })
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn domains(&self) -> &DomainRegistry {
        &self.domains
    }

    pub fn engine(&self) -> Arc<dyn ConstraintEngine> {
        self.engine.clone()
    }

    pub fn fetcher(&self) -> &ContentFetcher {
        &self.fetcher
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.config.temp_dir()
    }
}
