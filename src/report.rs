//! Report syntax negotiation and serialization.

use crate::error::ValidatorError;
use crate::rdf::{RdfGraph, RdfSyntax, encode};

/// Fallback when a negotiated syntax has no writer.
const FALLBACK_SYNTAX: RdfSyntax = RdfSyntax::RdfXml;

/// Picks the media type the report is written in.
///
/// An explicit `requested` syntax must be recognized or the request is
/// rejected. Otherwise each `Accept` header value is checked against
/// `allow_list`, in allow-list order, and the first hit wins. Failing both,
/// `default_syntax` is used as configured.
pub fn negotiate<'h>(
    requested: Option<&str>,
    accept_values: impl IntoIterator<Item = &'h str>,
    allow_list: &[String],
    default_syntax: &str,
) -> Result<String, ValidatorError> {
    if let Some(requested) = requested.map(str::trim).filter(|value| !value.is_empty()) {
        return match RdfSyntax::from_media_type(requested) {
            Some(_) => Ok(requested.to_string()),
            None => Err(ValidatorError::bad_parameter("reportSyntax")
                .message(format!("Unsupported report syntax '{requested}'"))
                .suggestion(format!(
                    "Use one of: {}",
                    RdfSyntax::all()
                        .map(RdfSyntax::media_type)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
                .build()),
        };
    }

    for header in accept_values {
        let ranges: Vec<&str> = header
            .split(',')
            .map(|range| range.split(';').next().unwrap_or("").trim())
            .filter(|range| !range.is_empty())
            .collect();
        let accepted = allow_list.iter().find(|candidate| {
            ranges
                .iter()
                .any(|range| range.eq_ignore_ascii_case(candidate.as_str()))
        });
        if let Some(accepted) = accepted {
            return Ok(accepted.clone());
        }
    }

    Ok(default_syntax.to_string())
}

/// Serializes `report` as `media_type` and returns the bytes together with
/// the media type actually written.
///
/// A media type without a usable writer falls back to RDF/XML instead of
/// failing the request.
pub fn format(report: &RdfGraph, media_type: &str) -> Result<(Vec<u8>, String), ValidatorError> {
    let syntax = RdfSyntax::from_media_type(media_type).filter(|syntax| syntax.format().is_some());
    let (syntax, content_type) = match syntax {
        Some(syntax) => (syntax, media_type.to_string()),
        None => {
            tracing::warn!(media_type, fallback = %FALLBACK_SYNTAX, "no writer for report syntax");
            (FALLBACK_SYNTAX, FALLBACK_SYNTAX.media_type().to_string())
        }
    };
    let bytes = encode(report, syntax).map_err(|error| {
        let failure = ValidatorError::engine_failure()
            .message(error.to_string())
            .build();
        tracing::error!(error_id = %failure.error_id, error = %error, "failed to serialize report");
        failure
    })?;
    Ok((bytes, content_type))
}
