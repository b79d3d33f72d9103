use crate::input::DEFAULT_MAX_FETCH_BYTES;
use crate::rdf::RdfSyntax;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

const DEFAULT_RESOURCE_ROOT: &str = "resources";
const DEFAULT_SHACL_EXTENSIONS: &[&str] = &["ttl", "rdf", "owl", "xml", "nt", "n3", "jsonld"];
const DEFAULT_ACCEPT_TYPES: &[&str] = &[
    "application/ld+json",
    "application/rdf+xml",
    "text/turtle",
    "application/n-triples",
];
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_IMPORT_DEPTH: usize = 10;
const DEFAULT_HYDRA_SERVER: &str = "http://localhost:8080";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 45;

/// Process-wide settings, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding one sub-directory per domain
    pub resource_root: PathBuf,
    /// Restrict the served domains to these names
    pub enabled_domains: Option<HashSet<String>>,
    /// Lower-cased extensions picked up from shape directories
    pub shacl_extensions: Vec<String>,
    /// Report media types a client may select through `Accept`
    pub accept_types: Vec<String>,
    pub http_bind_address: SocketAddr,
    /// Where materialized request content is written; system temp dir if unset
    pub tmp_dir: Option<PathBuf>,
    pub fetch_timeout_secs: u64,
    /// Largest body accepted from a remote content or import URL
    pub max_fetch_bytes: u64,
    pub max_import_depth: usize,
    pub hydra_server: String,
    pub hydra_root_path: String,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from(DEFAULT_RESOURCE_ROOT),
            enabled_domains: None,
            shacl_extensions: owned(DEFAULT_SHACL_EXTENSIONS),
            accept_types: owned(DEFAULT_ACCEPT_TYPES),
            http_bind_address: default_bind_address(),
            tmp_dir: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_fetch_bytes: DEFAULT_MAX_FETCH_BYTES,
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
            hydra_server: DEFAULT_HYDRA_SERVER.to_string(),
            hydra_root_path: String::new(),
            graceful_shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            resource_root: cli_resource_root,
            domains: cli_domains,
            shacl_extensions: cli_shacl_extensions,
            accept_types: cli_accept_types,
            http_bind: cli_http_bind,
            tmp_dir: cli_tmp_dir,
            fetch_timeout_secs: cli_fetch_timeout_secs,
            max_fetch_bytes: cli_max_fetch_bytes,
            max_import_depth: cli_max_import_depth,
            hydra_server: cli_hydra_server,
            hydra_root_path: cli_hydra_root_path,
            graceful_shutdown_timeout_secs: cli_shutdown_timeout_secs,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            resource_root: file_resource_root,
            domains: file_domains,
            shacl_extensions: file_shacl_extensions,
            accept_types: file_accept_types,
            http_bind: file_http_bind,
            tmp_dir: file_tmp_dir,
            fetch_timeout_secs: file_fetch_timeout_secs,
            max_fetch_bytes: file_max_fetch_bytes,
            max_import_depth: file_max_import_depth,
            hydra_server: file_hydra_server,
            hydra_root_path: file_hydra_root_path,
            graceful_shutdown_timeout_secs: file_shutdown_timeout_secs,
        } = file_config;

        let resource_root = cli_resource_root
            .or(file_resource_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESOURCE_ROOT));

        let enabled_domains = cli_domains
            .or(file_domains)
            .map(|domains| {
                domains
                    .into_iter()
                    .map(|domain| domain.trim().to_string())
                    .filter(|domain| !domain.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());

        let mut shacl_extensions = cli_shacl_extensions
            .or(file_shacl_extensions)
            .unwrap_or_else(|| owned(DEFAULT_SHACL_EXTENSIONS))
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect::<Vec<_>>();
        shacl_extensions.sort();
        shacl_extensions.dedup();

        anyhow::ensure!(
            !shacl_extensions.is_empty(),
            "at least one SHACL file extension must be provided"
        );

        let mut accept_types = Vec::new();
        for media_type in cli_accept_types
            .or(file_accept_types)
            .unwrap_or_else(|| owned(DEFAULT_ACCEPT_TYPES))
        {
            let media_type = media_type.trim().to_ascii_lowercase();
            if !media_type.is_empty() && !accept_types.contains(&media_type) {
                accept_types.push(media_type);
            }
        }

        let http_bind_address = cli_http_bind
            .or(file_http_bind)
            .unwrap_or_else(default_bind_address);

        let hydra_root_path = cli_hydra_root_path
            .or(file_hydra_root_path)
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();

        let hydra_server = cli_hydra_server
            .or(file_hydra_server)
            .unwrap_or_else(|| DEFAULT_HYDRA_SERVER.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            resource_root,
            enabled_domains,
            shacl_extensions,
            accept_types,
            http_bind_address,
            tmp_dir: cli_tmp_dir.or(file_tmp_dir),
            fetch_timeout_secs: cli_fetch_timeout_secs
                .or(file_fetch_timeout_secs)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            max_fetch_bytes: cli_max_fetch_bytes
                .or(file_max_fetch_bytes)
                .unwrap_or(DEFAULT_MAX_FETCH_BYTES),
            max_import_depth: cli_max_import_depth
                .or(file_max_import_depth)
                .unwrap_or(DEFAULT_MAX_IMPORT_DEPTH),
            hydra_server,
            hydra_root_path,
            graceful_shutdown_timeout_secs: cli_shutdown_timeout_secs
                .or(file_shutdown_timeout_secs)
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        })
    }

    /// Fail-fast checks run before the server binds.
    pub fn validate(&self) -> Result<()> {
        self.ensure_resource_root()?;

        anyhow::ensure!(
            !self.shacl_extensions.is_empty(),
            "at least one SHACL file extension must be provided"
        );
        anyhow::ensure!(
            self.fetch_timeout_secs > 0,
            "fetch timeout must be at least one second"
        );
        anyhow::ensure!(self.max_fetch_bytes > 0, "fetch size limit must be positive");
        for media_type in &self.accept_types {
            anyhow::ensure!(
                RdfSyntax::from_media_type(media_type).is_some(),
                "accept type {media_type:?} is not a supported RDF syntax"
            );
        }
        if let Some(tmp_dir) = self.tmp_dir.as_ref() {
            anyhow::ensure!(
                tmp_dir.is_dir(),
                "temporary directory {:?} does not exist",
                tmp_dir
            );
        }
        Ok(())
    }

    pub fn ensure_resource_root(&self) -> Result<()> {
        anyhow::ensure!(
            self.resource_root.exists(),
            "resource root {:?} does not exist",
            self.resource_root
        );
        anyhow::ensure!(
            self.resource_root.is_dir(),
            "resource root {:?} is not a directory",
            self.resource_root
        );
        Ok(())
    }

    pub fn is_domain_enabled(&self, domain: &str) -> bool {
        match &self.enabled_domains {
            Some(set) => set.contains(domain),
            None => true,
        }
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.tmp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Whether `extension` (without dot, any case) may hold shapes.
    pub fn accepts_shacl_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.shacl_extensions.iter().any(|ext| *ext == extension)
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "shacl-validator",
    about = "REST service validating RDF content against SHACL shapes",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_RESOURCE_ROOT",
        value_name = "DIR",
        help = "Directory containing one sub-directory per validation domain"
    )]
    pub resource_root: Option<PathBuf>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_DOMAINS",
        value_name = "DOMAIN",
        value_delimiter = ',',
        help = "Comma-separated list of domains to serve (default: all)"
    )]
    pub domains: Option<Vec<String>>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_SHACL_EXTENSIONS",
        value_name = "EXT",
        value_delimiter = ',',
        help = "Comma-separated file extensions loaded from shape directories"
    )]
    pub shacl_extensions: Option<Vec<String>>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_ACCEPT_TYPES",
        value_name = "MIME",
        value_delimiter = ',',
        help = "Report syntaxes that may be selected through the Accept header"
    )]
    pub accept_types: Option<Vec<String>>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_TMP_DIR",
        value_name = "DIR",
        help = "Directory for temporary copies of request content"
    )]
    pub tmp_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_FETCH_TIMEOUT_SECS",
        value_name = "SECS",
        help = "Timeout for fetching remote content and imports",
        value_parser = clap::value_parser!(u64)
    )]
    pub fetch_timeout_secs: Option<u64>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_MAX_FETCH_BYTES",
        value_name = "BYTES",
        help = "Largest response body read from remote content and imports",
        value_parser = clap::value_parser!(u64)
    )]
    pub max_fetch_bytes: Option<u64>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_MAX_IMPORT_DEPTH",
        value_name = "N",
        help = "Maximum owl:imports nesting followed when imports are loaded",
        value_parser = clap::value_parser!(usize)
    )]
    pub max_import_depth: Option<usize>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_HYDRA_SERVER",
        value_name = "URL",
        help = "Public base URL used in Hydra documentation links"
    )]
    pub hydra_server: Option<String>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_HYDRA_ROOT_PATH",
        value_name = "PATH",
        help = "Path prefix inserted between the Hydra server URL and the domain"
    )]
    pub hydra_root_path: Option<String>,

    #[arg(
        long,
        env = "SHACL_VALIDATOR_SHUTDOWN_TIMEOUT_SECS",
        value_name = "SECS",
        help = "Maximum time to wait for in-flight requests on shutdown",
        value_parser = clap::value_parser!(u64)
    )]
    pub graceful_shutdown_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    resource_root: Option<PathBuf>,
    domains: Option<Vec<String>>,
    shacl_extensions: Option<Vec<String>>,
    accept_types: Option<Vec<String>>,
    http_bind: Option<SocketAddr>,
    tmp_dir: Option<PathBuf>,
    fetch_timeout_secs: Option<u64>,
    max_fetch_bytes: Option<u64>,
    max_import_depth: Option<usize>,
    hydra_server: Option<String>,
    hydra_root_path: Option<String>,
    graceful_shutdown_timeout_secs: Option<u64>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_HTTP_PORT))
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
