use super::DomainConfig;
use crate::config::ServerConfig;
use crate::error::ValidatorError;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

const DESCRIPTOR_NAMES: &[&str] = &["domain.yaml", "domain.yml", "domain.json"];

/// Every configured domain, keyed by request name. Immutable once loaded.
#[derive(Debug, Default, Clone)]
pub struct DomainRegistry {
    domains: IndexMap<String, Arc<DomainConfig>>,
}

impl DomainRegistry {
    /// Scans the direct children of the resource root for domain descriptors.
    pub fn load(config: &ServerConfig) -> Result<Self> {
        let mut domains = Vec::new();
        let walker = WalkDir::new(&config.resource_root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.with_context(|| {
                format!("failed to scan resource root {:?}", config.resource_root)
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(descriptor) = find_descriptor(entry.path()) else {
                tracing::debug!(path = %entry.path().display(), "skipping directory without domain descriptor");
                continue;
            };
            let folder = entry.file_name().to_string_lossy().into_owned();
            let domain = load_descriptor(&descriptor, &folder)?;
            if !config.is_domain_enabled(&domain.name) {
                tracing::info!(domain = %domain.name, "domain disabled by configuration");
                continue;
            }
            domains.push(domain);
        }

        let registry = Self::from_domains(domains)?;
        tracing::info!(
            domain_count = registry.len(),
            domains = %registry.names().collect::<Vec<_>>().join(", "),
            "domain configurations loaded"
        );
        Ok(registry)
    }

    pub fn from_domains(domains: impl IntoIterator<Item = DomainConfig>) -> Result<Self> {
        let mut map = IndexMap::new();
        for domain in domains {
            domain.validate()?;
            let name = domain.name.clone();
            anyhow::ensure!(
                map.insert(name.clone(), Arc::new(domain)).is_none(),
                "domain name '{name}' is configured more than once"
            );
        }
        Ok(Self { domains: map })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<DomainConfig>> {
        self.domains.get(name)
    }

    /// The domain behind a REST request path, or NotFound.
    pub fn rest_domain(&self, name: &str) -> Result<Arc<DomainConfig>, ValidatorError> {
        match self.domains.get(name) {
            Some(domain) if domain.is_rest_enabled() => Ok(domain.clone()),
            _ => Err(ValidatorError::not_found(name).build()),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

fn find_descriptor(dir: &Path) -> Option<std::path::PathBuf> {
    DESCRIPTOR_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn load_descriptor(path: &Path, folder: &str) -> Result<DomainConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read domain descriptor {:?}", path))?;
    let mut domain: DomainConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON domain descriptor {:?}", path))?,
        _ => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML domain descriptor {:?}", path))?,
    };
    domain.folder = folder.to_string();
    if domain.name.trim().is_empty() {
        domain.name = folder.to_string();
    }
    Ok(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn write_domain(root: &Path, folder: &str, descriptor: &str) {
        let dir = root.join(folder);
        fs::create_dir_all(&dir).expect("domain dir");
        fs::write(dir.join("domain.yaml"), descriptor).expect("descriptor");
    }

    #[test]
    fn loads_domains_and_respects_filter() {
        let root = tempfile::tempdir().expect("tempdir");
        write_domain(root.path(), "alpha", "validation_types:\n  t:\n    shapes: s.ttl\n");
        write_domain(
            root.path(),
            "beta",
            "name: renamed\nvalidation_types:\n  t:\n    shapes: s.ttl\n",
        );
        fs::create_dir_all(root.path().join("no-descriptor")).expect("dir");

        let mut config = ServerConfig {
            resource_root: root.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let registry = DomainRegistry::load(&config).expect("load");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["alpha", "renamed"]);
        assert_eq!(registry.get("renamed").expect("renamed").folder, "beta");

        config.enabled_domains = Some(["alpha".to_string()].into_iter().collect());
        let registry = DomainRegistry::load(&config).expect("load filtered");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rest_domain_rejects_unknown_and_non_rest() {
        let root = tempfile::tempdir().expect("tempdir");
        write_domain(
            root.path(),
            "forms",
            "channels: [form]\nvalidation_types:\n  t:\n    shapes: s.ttl\n",
        );
        let config = ServerConfig {
            resource_root: root.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let registry = DomainRegistry::load(&config).expect("load");

        let err = registry.rest_domain("forms").expect_err("form only");
        assert_eq!(err.code, ErrorCode::NotFound);
        let err = registry.rest_domain("missing").expect_err("unknown");
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn invalid_descriptor_fails_startup() {
        let root = tempfile::tempdir().expect("tempdir");
        write_domain(root.path(), "empty", "validation_types: {}\n");
        let config = ServerConfig {
            resource_root: root.path().to_path_buf(),
            ..ServerConfig::default()
        };
        assert!(DomainRegistry::load(&config).is_err());
    }
}
