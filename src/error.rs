//! Client-facing errors for the validation API
//!
//! Every failure a request can surface is one of five [`ErrorCode`]s. Each
//! error carries a unique id that is logged next to the full diagnostic, so an
//! operator can correlate a terse client response with the server-side cause.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const ENGINE_FAILURE_MESSAGE: &str =
    "An unexpected error occurred during validation. Check the server logs for error id";

// =============================================================================
// ERROR CODES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown domain, or one not published on the REST channel
    NotFound,
    /// A request value failed validation before the engine ran
    BadParameter,
    /// Well-formed request for something the service does not do
    UnsupportedFeature,
    /// No shape file could be resolved for the domain and type
    ResourceMissing,
    /// Codec or engine failure while validating
    EngineFailure,
}

impl ErrorCode {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::BadParameter => "BAD_PARAMETER",
            ErrorCode::UnsupportedFeature => "UNSUPPORTED_FEATURE",
            ErrorCode::ResourceMissing => "RESOURCE_MISSING",
            ErrorCode::EngineFailure => "ENGINE_FAILURE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::BadParameter | ErrorCode::UnsupportedFeature => StatusCode::BAD_REQUEST,
            ErrorCode::ResourceMissing | ErrorCode::EngineFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error category for metrics
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::BadParameter => "client_error",
            ErrorCode::UnsupportedFeature => "unsupported",
            ErrorCode::ResourceMissing => "configuration_error",
            ErrorCode::EngineFailure => "server_error",
        }
    }

    /// Whether the response body may echo the error's own message.
    fn exposes_message(&self) -> bool {
        !matches!(self, ErrorCode::EngineFailure)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// ERROR CONTEXT
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Set only for configured domains. Names taken from an unknown request
    /// path stay in the message, so error telemetry keys remain bounded by
    /// the domain registry.
    pub domain: Option<String>,
    /// Request field that was rejected
    pub parameter: Option<String>,
    pub validation_type: Option<String>,
    /// Shape file being evaluated when the failure happened. Logged, never
    /// sent to clients.
    #[serde(skip)]
    pub shape_file: Option<String>,
    pub suggestions: Vec<String>,
}

// =============================================================================
// VALIDATOR ERROR
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ValidatorError {
    pub code: ErrorCode,
    pub message: String,
    pub error_id: String,
    pub context: ErrorContext,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ValidatorError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            error_id: Self::generate_error_id(),
            context: ErrorContext::default(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn builder(code: ErrorCode) -> ErrorBuilder {
        ErrorBuilder::new(code)
    }

    /// Domain missing, undefined or not exposed over REST
    pub fn not_found(domain: impl Into<String>) -> ErrorBuilder {
        let domain = domain.into();
        ErrorBuilder::new(ErrorCode::NotFound)
            .message(format!("The requested domain '{domain}' is not available"))
    }

    /// Rejected request value; the parameter name is reported to the client
    pub fn bad_parameter(parameter: impl Into<String>) -> ErrorBuilder {
        let parameter = parameter.into();
        ErrorBuilder::new(ErrorCode::BadParameter)
            .message(format!("Invalid value provided for parameter '{parameter}'"))
            .parameter(parameter)
    }

    pub fn unsupported(feature: impl Into<String>) -> ErrorBuilder {
        let feature = feature.into();
        ErrorBuilder::new(ErrorCode::UnsupportedFeature)
            .message(format!("Unsupported feature: {feature}"))
            .parameter(feature)
    }

    pub fn resource_missing() -> ErrorBuilder {
        ErrorBuilder::new(ErrorCode::ResourceMissing)
            .message("No SHACL shapes are configured for the requested validation type")
    }

    pub fn engine_failure() -> ErrorBuilder {
        ErrorBuilder::new(ErrorCode::EngineFailure).message(ENGINE_FAILURE_MESSAGE)
    }

    /// Add this error to telemetry
    pub fn track(&self) {
        ERROR_METRICS.record_error(&self.code, self.context.domain.as_deref());
    }

    fn generate_error_id() -> String {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        let timestamp = chrono::Utc::now().timestamp_millis();
        format!("err_{:x}_{:x}", timestamp, count)
    }

    /// Message safe to hand to clients.
    pub fn public_message(&self) -> String {
        if self.code.exposes_message() {
            self.message.clone()
        } else {
            format!("{ENGINE_FAILURE_MESSAGE} {}", self.error_id)
        }
    }
}

impl fmt::Display for ValidatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(parameter) = &self.context.parameter {
            write!(f, " (parameter: {parameter})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidatorError {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: &'static str,
    message: String,
    error_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<String>,
    timestamp: String,
}

impl IntoResponse for ValidatorError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.code(),
            message: self.public_message(),
            timestamp: self.timestamp.to_rfc3339(),
            error_id: self.error_id,
            parameter: self.context.parameter,
            suggestions: self.context.suggestions,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

// =============================================================================
// ERROR BUILDER
// =============================================================================

pub struct ErrorBuilder {
    error: ValidatorError,
}

impl ErrorBuilder {
    fn new(code: ErrorCode) -> Self {
        Self {
            error: ValidatorError::new(code, ""),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.error.message = message.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.error.context.domain = Some(domain.into());
        self
    }

    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.error.context.parameter = Some(parameter.into());
        self
    }

    pub fn validation_type(mut self, validation_type: impl Into<String>) -> Self {
        self.error.context.validation_type = Some(validation_type.into());
        self
    }

    pub fn shape_file(mut self, shape_file: impl Into<String>) -> Self {
        self.error.context.shape_file = Some(shape_file.into());
        self
    }

    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.error.context.suggestions.push(suggestion.into());
        self
    }

    pub fn build(self) -> ValidatorError {
        self.error
    }
}

// =============================================================================
// ERROR TELEMETRY
// =============================================================================

#[derive(Debug)]
pub struct ErrorMetrics {
    error_counts: RwLock<HashMap<ErrorCode, AtomicU64>>,
    domain_errors: RwLock<HashMap<String, AtomicU64>>,
    category_counts: RwLock<HashMap<String, AtomicU64>>,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self {
            error_counts: RwLock::new(HashMap::new()),
            domain_errors: RwLock::new(HashMap::new()),
            category_counts: RwLock::new(HashMap::new()),
        }
    }

    /// Record an error occurrence
    pub fn record_error(&self, code: &ErrorCode, domain: Option<&str>) {
        increment(&self.error_counts, code);
        if let Some(domain) = domain {
            increment(&self.domain_errors, domain);
        }
        let category = code.category();
        increment(&self.category_counts, category);

        tracing::debug!(
            error_code = %code,
            domain = domain,
            category = category,
            "error recorded"
        );
    }

    pub fn get_error_count(&self, code: &ErrorCode) -> u64 {
        load(&self.error_counts, code)
    }

    pub fn get_domain_error_count(&self, domain: &str) -> u64 {
        load(&self.domain_errors, domain)
    }

    pub fn get_category_count(&self, category: &str) -> u64 {
        load(&self.category_counts, category)
    }

    pub fn get_stats(&self) -> ErrorStats {
        ErrorStats {
            error_counts: snapshot(&self.error_counts),
            domain_errors: snapshot(&self.domain_errors),
            category_counts: snapshot(&self.category_counts),
        }
    }

    pub fn reset(&self) {
        self.error_counts.write().clear();
        self.domain_errors.write().clear();
        self.category_counts.write().clear();
    }
}

impl Default for ErrorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn increment<K, Q>(map: &RwLock<HashMap<K, AtomicU64>>, key: &Q)
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: ToOwned<Owned = K> + std::hash::Hash + Eq + ?Sized,
{
    {
        let read = map.read();
        if let Some(counter) = read.get(key) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }
    map.write()
        .entry(key.to_owned())
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

fn load<K, Q>(map: &RwLock<HashMap<K, AtomicU64>>, key: &Q) -> u64
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + ?Sized,
{
    map.read()
        .get(key)
        .map(|counter| counter.load(Ordering::Relaxed))
        .unwrap_or(0)
}

fn snapshot<K>(map: &RwLock<HashMap<K, AtomicU64>>) -> HashMap<K, u64>
where
    K: Clone + std::hash::Hash + Eq,
{
    map.read()
        .iter()
        .map(|(key, counter)| (key.clone(), counter.load(Ordering::Relaxed)))
        .collect()
}

/// Error statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub error_counts: HashMap<ErrorCode, u64>,
    pub domain_errors: HashMap<String, u64>,
    pub category_counts: HashMap<String, u64>,
}

/// Global error metrics instance
pub static ERROR_METRICS: once_cell::sync::Lazy<ErrorMetrics> =
    once_cell::sync::Lazy::new(ErrorMetrics::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::BadParameter.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::UnsupportedFeature.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ResourceMissing.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_ne!(
            ErrorCode::UnsupportedFeature.code(),
            ErrorCode::BadParameter.code()
        );
    }

    #[test]
    fn test_error_builder() {
        let error = ValidatorError::bad_parameter("reportSyntax")
            .domain("any")
            .validation_type("default")
            .suggestion("Use one of text/turtle, application/rdf+xml")
            .build();

        assert_eq!(error.code, ErrorCode::BadParameter);
        assert!(error.message.contains("reportSyntax"));
        assert_eq!(error.context.parameter.as_deref(), Some("reportSyntax"));
        assert_eq!(error.context.domain.as_deref(), Some("any"));
        assert_eq!(error.context.suggestions.len(), 1);
        assert!(error.error_id.starts_with("err_"));
    }

    #[test]
    fn test_engine_failure_hides_details() {
        let error = ValidatorError::engine_failure()
            .message("turtle parse error at line 3: unexpected '.'")
            .shape_file("/srv/resources/any/shapes/a.ttl")
            .build();
        let public = error.public_message();
        assert!(!public.contains("line 3"));
        assert!(public.contains(&error.error_id));

        let serialized = serde_json::to_value(&error.context).expect("serialize");
        assert!(serialized.get("shape_file").is_none());
    }

    #[test]
    fn test_error_metrics() {
        let metrics = ErrorMetrics::new();

        metrics.record_error(&ErrorCode::BadParameter, Some("any"));
        metrics.record_error(&ErrorCode::BadParameter, Some("any"));
        metrics.record_error(&ErrorCode::NotFound, None);

        assert_eq!(metrics.get_error_count(&ErrorCode::BadParameter), 2);
        assert_eq!(metrics.get_error_count(&ErrorCode::NotFound), 1);
        assert_eq!(metrics.get_domain_error_count("any"), 2);
        assert_eq!(metrics.get_category_count("client_error"), 2);
        assert_eq!(metrics.get_stats().category_counts["not_found"], 1);

        metrics.reset();
        assert_eq!(metrics.get_error_count(&ErrorCode::BadParameter), 0);
    }

    #[test]
    fn test_unknown_domains_are_not_telemetry_keys() {
        let error = ValidatorError::not_found("bogus-1").build();
        assert!(error.message.contains("bogus-1"));
        assert_eq!(error.context.domain, None);

        let metrics = ErrorMetrics::new();
        metrics.record_error(&error.code, error.context.domain.as_deref());
        assert!(metrics.get_stats().domain_errors.is_empty());
        assert_eq!(metrics.get_error_count(&ErrorCode::NotFound), 1);
    }
}
