//! RDF plumbing shared by every stage of the validation pipeline.

pub mod codec;
pub mod graph;
pub mod syntax;

pub use codec::{CodecError, decode, encode, select_syntax};
pub use graph::{PrefixMap, RdfGraph};
pub use syntax::RdfSyntax;

/// SHACL namespace.
pub const SH_NAMESPACE: &str = "http://www.w3.org/ns/shacl#";
/// Prefix reports are tagged with.
pub const SH_PREFIX: &str = "sh";
