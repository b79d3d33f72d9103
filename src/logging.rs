//! Structured logging and optional OpenTelemetry export.
//!
//! Configured from the environment:
//! - `LOG_FORMAT` = `json` | `pretty` (json by default in production)
//! - `LOG_OUTPUT` = `stdout` | `stderr` | `file`, with `LOG_DIR` for files
//! - `ENVIRONMENT` / `ENV` selects production defaults
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` turns on trace export
//! - `RUST_LOG` overrides the level filter

use anyhow::{Context, Result};
use opentelemetry::{
    KeyValue,
    trace::{TraceError, TracerProvider as _},
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const SERVICE_NAME: &str = "shacl-validator";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    /// Directory for daily-rotated log files when output is `File`
    pub log_dir: PathBuf,
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub otlp_endpoint: Option<String>,
    /// Trace sampling ratio between 0.0 and 1.0
    pub otel_sampling_rate: f64,
    pub otlp_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let production = is_production(&environment);

        Self {
            format: if production {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            service_name: SERVICE_NAME.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
            otlp_endpoint: None,
            otel_sampling_rate: if production { 0.1 } else { 1.0 },
            otlp_timeout_secs: 10,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(format) = env::var("LOG_FORMAT") {
            config.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => config.format,
            };
        }
        if let Ok(output) = env::var("LOG_OUTPUT") {
            config.output = match output.to_lowercase().as_str() {
                "stdout" => LogOutput::Stdout,
                "stderr" => LogOutput::Stderr,
                "file" => LogOutput::File,
                _ => config.output,
            };
        }
        if let Ok(log_dir) = env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir);
        }

        config.otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());
        if let Some(rate) = env::var("OTEL_SAMPLING_RATE")
            .ok()
            .and_then(|rate| rate.parse::<f64>().ok())
        {
            config.otel_sampling_rate = rate.clamp(0.0, 1.0);
        }
        if let Some(timeout) = env::var("OTEL_EXPORTER_OTLP_TIMEOUT")
            .ok()
            .and_then(|timeout| timeout.parse::<u64>().ok())
        {
            config.otlp_timeout_secs = timeout;
        }

        config
    }

    fn resource(&self) -> Resource {
        Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                self.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                self.service_version.clone(),
            ),
            KeyValue::new("environment", self.environment.clone()),
        ])
    }

    fn sampler(&self) -> Sampler {
        if self.otel_sampling_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.otel_sampling_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                self.otel_sampling_rate,
            )))
        }
    }
}

fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// or buffered log lines are lost.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if is_production(&config.environment) {
            "info"
        } else {
            "debug"
        };
        EnvFilter::new(format!("{level},hyper=info,tower=info,reqwest=info"))
    });

    let (writer, guard) = match config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        LogOutput::File => {
            std::fs::create_dir_all(&config.log_dir).context("failed to create log directory")?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(
                &config.log_dir,
                SERVICE_NAME,
            ))
        }
    };

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter)
            .boxed(),
    };

    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => match init_tracer_provider(&config, endpoint) {
            Ok(provider) => Some(
                tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME)),
            ),
            Err(error) => {
                eprintln!(
                    "warning: OpenTelemetry exporter for {endpoint} failed to start: {error}; continuing without trace export"
                );
                None
            }
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        format = ?config.format,
        output = ?config.output,
        otlp = config.otlp_endpoint.is_some(),
        "logging initialized"
    );
    Ok(guard)
}

fn init_tracer_provider(
    config: &LoggingConfig,
    endpoint: &str,
) -> Result<TracerProvider, TraceError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(config.otlp_timeout_secs));

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(config.sampler())
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(config.resource()),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

pub fn shutdown_telemetry() {
    tracing::info!("shutting down telemetry");
    opentelemetry::global::shutdown_tracer_provider();
}

/// Span wrapping one validation request. Every event logged while handling
/// the request carries the domain and validation type.
pub fn validation_span(domain: &str, validation_type: &str) -> tracing::Span {
    tracing::info_span!(
        "validation_request",
        domain = domain,
        validation_type = validation_type,
        service = SERVICE_NAME,
    )
}
