//! Validation orchestration
//!
//! [`validate`] is a plain function over an explicit [`RequestContext`]. For
//! each shape file it decodes the shapes, decodes the request content with
//! the shapes' prefixes seeded in, runs the engine on data only, and tags
//! the per-file report with `sh`. The reports are merged once every file has
//! been evaluated. A failure on any file fails the whole request.

pub mod merge;

pub use merge::merge_reports;

use crate::domain::DomainConfig;
use crate::engine::{ConstraintEngine, EngineError};
use crate::error::ValidatorError;
use crate::input::ContentFile;
use crate::rdf::{CodecError, RdfGraph, SH_NAMESPACE, SH_PREFIX, decode, select_syntax};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything one validation needs, borrowed from the request.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub content: &'a ContentFile,
    pub validation_type: &'a str,
    pub domain: &'a DomainConfig,
    /// Triples loaded through owl:imports, added to the data of every run
    pub imports: Option<&'a RdfGraph>,
}

#[derive(Debug, Error)]
enum StepError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Validates the request content against every file in `shape_files` and
/// returns the merged report.
///
/// Errors are [`ErrorCode::EngineFailure`](crate::error::ErrorCode) whose
/// detail stays in the server log.
pub fn validate(
    ctx: &RequestContext<'_>,
    shape_files: &[PathBuf],
    engine: &dyn ConstraintEngine,
) -> Result<RdfGraph, ValidatorError> {
    let content = ctx
        .content
        .read()
        .map_err(|error| engine_failure(ctx, None, error.into()))?;

    let mut reports = Vec::with_capacity(shape_files.len());
    for shape_file in shape_files {
        tracing::info!(shape_file = %shape_file.display(), "validating against shape file");
        let report = validate_against(ctx, &content, shape_file, engine)
            .map_err(|error| engine_failure(ctx, Some(shape_file), error))?;
        tracing::info!(
            shape_file = %shape_file.display(),
            report_triples = report.len(),
            "shape file evaluated"
        );
        reports.push(report);
    }

    Ok(merge_reports(reports))
}

fn validate_against(
    ctx: &RequestContext<'_>,
    content: &[u8],
    shape_file: &Path,
    engine: &dyn ConstraintEngine,
) -> Result<RdfGraph, StepError> {
    let extension = shape_file.extension().and_then(|ext| ext.to_str());
    let shape_syntax = select_syntax(None, extension)?;
    let shapes = decode(&fs::read(shape_file)?, shape_syntax, None, None)?;

    let mut data = decode(
        content,
        ctx.content.syntax(),
        ctx.content.base_iri(),
        Some(shapes.prefixes()),
    )?;
    if let Some(imports) = ctx.imports {
        data.union_with(imports.clone());
    }

    let mut report = engine.evaluate(&data, &shapes, false)?;
    report.set_prefix(SH_PREFIX, SH_NAMESPACE);
    Ok(report)
}

fn engine_failure(
    ctx: &RequestContext<'_>,
    shape_file: Option<&Path>,
    error: StepError,
) -> ValidatorError {
    let mut builder = ValidatorError::engine_failure()
        .message(error.to_string())
        .domain(ctx.domain.name.clone())
        .validation_type(ctx.validation_type);
    if let Some(path) = shape_file {
        builder = builder.shape_file(path.display().to_string());
    }
    let failure = builder.build();
    tracing::error!(
        error_id = %failure.error_id,
        domain = %ctx.domain.name,
        validation_type = ctx.validation_type,
        shape_file = ?shape_file,
        error = %error,
        "validation failed"
    );
    failure
}
