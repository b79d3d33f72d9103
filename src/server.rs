//! HTTP surface of the validator.
//!
//! ```text
//! GET  /{domain}/api/info               validation types and report syntaxes
//! POST /{domain}/api/validate           validate one payload, 201 + report
//! POST /{domain}/api/validateMultiple   always UNSUPPORTED_FEATURE
//! GET  /{domain}/api                    Hydra entry point
//! GET  /{domain}/api/contexts/{name}    Hydra context
//! GET  /{domain}/api/vocab              Hydra vocabulary
//! GET  /health  /ready  /health/components  /metrics
//! ```

use crate::domain::DomainConfig;
use crate::error::{ErrorCode, ValidatorError};
use crate::health::{self, HealthChecker};
use crate::imports::resolve_imports;
use crate::input::{ContentFile, materialize};
use crate::logging::validation_span;
use crate::metrics::{METRICS, ValidationMetrics};
use crate::model::{ApiInfo, Input, ValidationTypeInfo};
use crate::rdf::{RdfGraph, decode};
use crate::report;
use crate::shapes;
use crate::state::AppState;
use crate::validation::{self, RequestContext};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT, ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_TYPE, LINK},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

const JSON_LD: &str = "application/ld+json";
const HYDRA_API_DOCUMENTATION: &str = "http://www.w3.org/ns/hydra/core#apiDocumentation";

pub fn build_router(state: Arc<AppState>) -> Router {
    let checker = Arc::new(HealthChecker::new(state.clone()));
    let operational = Router::new()
        .route("/health", get(health::liveness_handler))
        .route("/ready", get(health::readiness_handler))
        .route("/health/components", get(health::components_handler))
        .with_state(checker);

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/{domain}/api/info", get(info_handler))
        .route("/{domain}/api/validate", post(validate_handler))
        .route("/{domain}/api/validateMultiple", post(validate_multiple_handler))
        .route("/{domain}/api", get(hydra_api_handler))
        .route("/{domain}/api/contexts/{context}", get(hydra_context_handler))
        .route("/{domain}/api/vocab", get(hydra_vocab_handler))
        .with_state(state)
        .merge(operational)
}

/// A serialized report ready to send.
#[derive(Debug)]
pub struct Validated {
    pub body: Vec<u8>,
    pub content_type: String,
    pub shape_files: usize,
}

impl IntoResponse for Validated {
    fn into_response(self) -> Response {
        let content_type = HeaderValue::from_str(&self.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        (StatusCode::CREATED, [(CONTENT_TYPE, content_type)], self.body).into_response()
    }
}

/// Validates one request against the shapes of `domain_name`.
///
/// Parameter problems are reported before any content is fetched or parsed:
/// the domain, external rules, the validation type and the report syntax
/// are all checked first. The temporary content file lives until the
/// engine is done with it, on every path.
pub async fn validate_one(
    state: &AppState,
    domain_name: &str,
    input: Input,
    accept: &[String],
) -> Result<Validated, ValidatorError> {
    let domain = state.domains().rest_domain(domain_name)?;
    let metrics = ValidationMetrics::start(&domain.name);

    let result = validate_in_domain(state, domain.clone(), input, accept).await;
    match &result {
        Ok(validated) => metrics.success(validated.shape_files),
        Err(error) => metrics.error(error.code),
    }
    result.map_err(|mut error| {
        error
            .context
            .domain
            .get_or_insert_with(|| domain.name.clone());
        error
    })
}

async fn validate_in_domain(
    state: &AppState,
    domain: Arc<DomainConfig>,
    input: Input,
    accept: &[String],
) -> Result<Validated, ValidatorError> {
    if input.has_external_rules() {
        return Err(ValidatorError::unsupported("externalRules")
            .message("Client supplied shapes (externalRules) are not supported")
            .build());
    }
    let validation_type = select_validation_type(&domain, input.validation_type.as_deref())?;

    let span = validation_span(&domain.name, &validation_type);
    run_pipeline(state, domain, validation_type, input, accept)
        .instrument(span)
        .await
}

fn select_validation_type(
    domain: &DomainConfig,
    requested: Option<&str>,
) -> Result<String, ValidatorError> {
    match requested.map(str::trim).filter(|value| !value.is_empty()) {
        Some(requested) if domain.has_validation_type(requested) => Ok(requested.to_string()),
        Some(requested) => Err(ValidatorError::bad_parameter("validationType")
            .message(format!("Unknown validation type '{requested}'"))
            .suggestion(format!(
                "Use one of: {}",
                domain
                    .validation_types
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .build()),
        None => domain
            .default_validation_type()
            .map(str::to_string)
            .ok_or_else(|| ValidatorError::resource_missing().build()),
    }
}

async fn run_pipeline(
    state: &AppState,
    domain: Arc<DomainConfig>,
    validation_type: String,
    input: Input,
    accept: &[String],
) -> Result<Validated, ValidatorError> {
    let config = state.config();
    let report_syntax = report::negotiate(
        input.report_syntax.as_deref(),
        accept.iter().map(String::as_str),
        &config.accept_types,
        &domain.default_report_syntax,
    )?;

    let content = materialize(&input, state.fetcher(), &state.temp_dir()).await?;
    tracing::debug!(
        syntax = %content.syntax(),
        path = %content.path().display(),
        "content materialized"
    );

    let shape_files = shapes::resolve(
        &config.resource_root,
        &domain,
        &validation_type,
        &config.shacl_extensions,
    )
    .map_err(|error| {
        let missing = ValidatorError::resource_missing()
            .validation_type(validation_type.clone())
            .build();
        tracing::error!(error_id = %missing.error_id, %error, "no shape files resolved");
        missing
    })?;

    let imports = if input.load_imports.unwrap_or(domain.load_imports) {
        Some(load_imports(state, &content, config.max_import_depth).await?)
    } else {
        None
    };

    let engine = state.engine();
    let shape_count = shape_files.len();
    let span = tracing::Span::current();
    let (body, content_type) = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        let ctx = RequestContext {
            content: &content,
            validation_type: &validation_type,
            domain: &domain,
            imports: imports.as_ref(),
        };
        let merged = validation::validate(&ctx, &shape_files, engine.as_ref())?;
        report::format(&merged, &report_syntax)
    })
    .await
    .map_err(|error| {
        let failure = ValidatorError::engine_failure()
            .message(error.to_string())
            .build();
        tracing::error!(error_id = %failure.error_id, %error, "validation task did not complete");
        failure
    })??;

    Ok(Validated {
        body,
        content_type,
        shape_files: shape_count,
    })
}

async fn load_imports(
    state: &AppState,
    content: &ContentFile,
    max_depth: usize,
) -> Result<RdfGraph, ValidatorError> {
    let data = content
        .read()
        .map_err(|error| error.to_string())
        .and_then(|bytes| {
            decode(&bytes, content.syntax(), content.base_iri(), None)
                .map_err(|error| error.to_string())
        })
        .map_err(|message| {
            let failure = ValidatorError::engine_failure().message(message).build();
            tracing::error!(
                error_id = %failure.error_id,
                error = %failure.message,
                "content could not be read for import resolution"
            );
            failure
        })?;
    Ok(resolve_imports(&data, state.fetcher(), max_depth).await)
}

fn accept_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Every error leaving a handler is counted exactly once, here.
fn failure(error: ValidatorError) -> Response {
    error.track();
    if error.code != ErrorCode::EngineFailure {
        tracing::info!(
            error_id = %error.error_id,
            code = %error.code,
            parameter = ?error.context.parameter,
            "request rejected: {}",
            error.message
        );
    }
    error.into_response()
}

async fn validate_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Input>, JsonRejection>,
) -> Response {
    // Unknown domains answer 404 whatever the body looks like.
    if let Err(error) = state.domains().rest_domain(&domain) {
        return failure(error);
    }
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            return failure(
                ValidatorError::bad_parameter("body")
                    .message(format!("Request body is not a valid validation input: {rejection}"))
                    .domain(domain)
                    .build(),
            );
        }
    };

    match validate_one(&state, &domain, input, &accept_values(&headers)).await {
        Ok(validated) => validated.into_response(),
        Err(error) => failure(error),
    }
}

/// Batch validation is not offered, whatever the domain or body.
async fn validate_multiple_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Response {
    let mut error = ValidatorError::unsupported("validateMultiple")
        .message("Batch validation is not supported");
    if let Ok(domain) = state.domains().rest_domain(&domain) {
        error = error.domain(domain.name.clone());
    }
    failure(error.build())
}

async fn info_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Response {
    let domain = match state.domains().rest_domain(&domain) {
        Ok(domain) => domain,
        Err(error) => return failure(error),
    };
    Json(api_info(&domain, &state.config().accept_types)).into_response()
}

fn api_info(domain: &DomainConfig, accept_types: &[String]) -> ApiInfo {
    let report_syntaxes = if domain.report_syntaxes.is_empty() {
        accept_types.to_vec()
    } else {
        domain.report_syntaxes.clone()
    };
    ApiInfo {
        domain: domain.name.clone(),
        validation_types: domain
            .validation_types
            .iter()
            .map(|(kind, config)| ValidationTypeInfo {
                kind: kind.clone(),
                description: config.label.clone().unwrap_or_else(|| kind.clone()),
            })
            .collect(),
        report_syntaxes,
        default_report_syntax: domain.default_report_syntax.clone(),
    }
}

async fn hydra_api_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Response {
    let domain = match state.domains().rest_domain(&domain) {
        Ok(domain) => domain,
        Err(error) => return failure(error),
    };
    let body = match read_hydra_document(&state, &domain, "api.jsonld").await {
        Ok(body) => body,
        Err(error) => return failure(error),
    };

    let config = state.config();
    let link = format!(
        "<{}{}/{}/api/vocab>; rel=\"{HYDRA_API_DOCUMENTATION}\"",
        config.hydra_server, config.hydra_root_path, domain.name
    );
    let mut response = jsonld(body);
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("Link"));
    match HeaderValue::from_str(&link) {
        Ok(link) => {
            headers.insert(LINK, link);
        }
        Err(error) => tracing::warn!(%error, link, "hydra link is not a valid header value"),
    }
    response
}

/// Every context name is served from the same entry point document.
async fn hydra_context_handler(
    State(state): State<Arc<AppState>>,
    Path((domain, _context)): Path<(String, String)>,
) -> Response {
    hydra_document(&state, &domain, "EntryPoint.jsonld").await
}

async fn hydra_vocab_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Response {
    hydra_document(&state, &domain, "vocab.jsonld").await
}

async fn hydra_document(state: &AppState, domain: &str, file_name: &str) -> Response {
    let domain = match state.domains().rest_domain(domain) {
        Ok(domain) => domain,
        Err(error) => return failure(error),
    };
    match read_hydra_document(state, &domain, file_name).await {
        Ok(body) => jsonld(body),
        Err(error) => failure(error),
    }
}

fn hydra_path(state: &AppState, domain: &DomainConfig, file_name: &str) -> PathBuf {
    domain
        .directory(&state.config().resource_root)
        .join("hydra")
        .join(file_name)
}

async fn read_hydra_document(
    state: &AppState,
    domain: &DomainConfig,
    file_name: &str,
) -> Result<Vec<u8>, ValidatorError> {
    let path = hydra_path(state, domain, file_name);
    tokio::fs::read(&path).await.map_err(|error| {
        tracing::warn!(path = %path.display(), %error, "hydra document unavailable");
        ValidatorError::builder(ErrorCode::NotFound)
            .message(format!("No Hydra document '{file_name}' for this domain"))
            .domain(domain.name.clone())
            .build()
    })
}

fn jsonld(body: Vec<u8>) -> Response {
    ([(CONTENT_TYPE, HeaderValue::from_static(JSON_LD))], body).into_response()
}

async fn metrics_handler() -> Response {
    match METRICS.encode() {
        Ok(text) => (
            [(
                CONTENT_TYPE,
                HeaderValue::from_static("application/openmetrics-text; version=1.0.0; charset=utf-8"),
            )],
            text,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
