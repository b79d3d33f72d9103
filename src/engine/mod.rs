//! SHACL constraint evaluation
//!
//! The orchestrator talks to an engine through [`ConstraintEngine`] only, so
//! a different SHACL implementation can be swapped in at startup. The
//! bundled [`CoreShaclEngine`] evaluates SHACL Core. A shape that uses
//! anything outside of it, such as SPARQL-based constraints, is rejected
//! with [`EngineError::Unsupported`] rather than skipped, so a report never
//! claims conformance for a constraint that was not checked.

mod evaluator;
mod results;
pub mod shape;
pub mod vocab;

use crate::rdf::RdfGraph;
use thiserror::Error;

pub use evaluator::CoreShaclEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid shape {shape}: {message}")]
    InvalidShape { shape: String, message: String },

    #[error("invalid sh:pattern {pattern:?} in shape {shape}: {source}")]
    InvalidPattern {
        shape: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("shape {shape} uses {feature}, which this engine does not evaluate")]
    Unsupported { shape: String, feature: String },
}

/// Validates a data graph against a shapes graph and returns a graph holding
/// exactly one `sh:ValidationReport`.
pub trait ConstraintEngine: Send + Sync {
    /// `validate_shapes` also evaluates the shapes graph itself as data.
    fn evaluate(
        &self,
        data: &RdfGraph,
        shapes: &RdfGraph,
        validate_shapes: bool,
    ) -> Result<RdfGraph, EngineError>;
}
