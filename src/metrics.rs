//! Prometheus metrics for the validation service.

use crate::error::ErrorCode;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Instant;

pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub domain: String,
    /// `success` or the lower-cased error code
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub domain: String,
    pub error_type: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DomainLabels {
    pub domain: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,
    pub validations_total: Family<OutcomeLabels, Counter>,
    pub validation_duration_seconds: Family<DomainLabels, Histogram>,
    pub active_validations: Family<DomainLabels, Gauge>,
    pub shape_files_evaluated_total: Family<DomainLabels, Counter>,
    pub errors_total: Family<ErrorLabels, Counter>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let validations_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "validations",
            "Validation requests by domain and outcome",
            validations_total.clone(),
        );

        let validation_duration_seconds =
            Family::<DomainLabels, Histogram>::new_with_constructor(|| {
                // 5ms up to roughly 40s
                Histogram::new(exponential_buckets(0.005, 2.5, 11))
            });
        registry.register(
            "validation_duration_seconds",
            "End to end validation latency in seconds",
            validation_duration_seconds.clone(),
        );

        let active_validations = Family::<DomainLabels, Gauge>::default();
        registry.register(
            "active_validations",
            "Validations currently in progress",
            active_validations.clone(),
        );

        let shape_files_evaluated_total = Family::<DomainLabels, Counter>::default();
        registry.register(
            "shape_files_evaluated",
            "Shape files evaluated by successful validations",
            shape_files_evaluated_total.clone(),
        );

        let errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "errors",
            "Failed validations by domain and error type",
            errors_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            validations_total,
            validation_duration_seconds,
            active_validations,
            shape_files_evaluated_total,
            errors_total,
        }
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry.read())?;
        Ok(buffer)
    }

    fn record(&self, domain: &str, outcome: &str, elapsed: std::time::Duration) {
        self.validations_total
            .get_or_create(&OutcomeLabels {
                domain: domain.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
        self.validation_duration_seconds
            .get_or_create(&DomainLabels {
                domain: domain.to_string(),
            })
            .observe(elapsed.as_secs_f64());
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Times one validation and records its outcome. A guard dropped without
/// an outcome counts as `aborted`, which covers cancelled requests.
pub struct ValidationMetrics {
    domain: String,
    start: Instant,
    completed: bool,
}

impl ValidationMetrics {
    pub fn start(domain: &str) -> Self {
        METRICS
            .active_validations
            .get_or_create(&DomainLabels {
                domain: domain.to_string(),
            })
            .inc();
        Self {
            domain: domain.to_string(),
            start: Instant::now(),
            completed: false,
        }
    }

    pub fn success(mut self, shape_files: usize) {
        METRICS.record(&self.domain, "success", self.start.elapsed());
        METRICS
            .shape_files_evaluated_total
            .get_or_create(&DomainLabels {
                domain: self.domain.clone(),
            })
            .inc_by(shape_files as u64);
        self.finish();
    }

    pub fn error(mut self, code: ErrorCode) {
        let error_type = code.code().to_ascii_lowercase();
        METRICS.record(&self.domain, &error_type, self.start.elapsed());
        METRICS
            .errors_total
            .get_or_create(&ErrorLabels {
                domain: self.domain.clone(),
                error_type,
            })
            .inc();
        self.finish();
    }

    fn finish(&mut self) {
        self.completed = true;
        METRICS
            .active_validations
            .get_or_create(&DomainLabels {
                domain: self.domain.clone(),
            })
            .dec();
    }
}

impl Drop for ValidationMetrics {
    fn drop(&mut self) {
        if !self.completed {
            METRICS.record(&self.domain, "aborted", self.start.elapsed());
            self.finish();
        }
    }
}
