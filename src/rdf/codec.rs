//! Bytes to graph and back, on top of oxigraph's parsers and serializers.

use super::graph::{PrefixMap, RdfGraph};
use super::syntax::RdfSyntax;
use oxigraph::io::{RdfParser, RdfSerializer};
use oxigraph::model::{Graph, Triple};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("no RDF syntax could be determined (declared: {declared:?}, extension: {extension:?})")]
    UnknownSyntax {
        declared: Option<String>,
        extension: Option<String>,
    },

    #[error("{0} is not supported by the RDF library")]
    UnsupportedSyntax(RdfSyntax),

    #[error("invalid base IRI {iri}: {message}")]
    BaseIri { iri: String, message: String },

    #[error("failed to parse {syntax} content: {message}")]
    Parse { syntax: RdfSyntax, message: String },

    #[error("invalid namespace for prefix '{prefix}': {message}")]
    Prefix { prefix: String, message: String },

    #[error("failed to write {syntax} output: {source}")]
    Write {
        syntax: RdfSyntax,
        #[source]
        source: std::io::Error,
    },
}

/// Picks the syntax for a payload or reports why none applies.
pub fn select_syntax(
    declared: Option<&str>,
    extension: Option<&str>,
) -> Result<RdfSyntax, CodecError> {
    RdfSyntax::resolve(declared, extension).ok_or_else(|| CodecError::UnknownSyntax {
        declared: declared.map(str::to_string),
        extension: extension.map(str::to_string),
    })
}

/// Parses `bytes` as `syntax`.
///
/// The returned graph starts with the bindings of `seed` and then takes the
/// prefixes declared by the document itself, which win on conflict. Quads in
/// named graphs are folded into the default graph.
pub fn decode(
    bytes: &[u8],
    syntax: RdfSyntax,
    base_iri: Option<&str>,
    seed: Option<&PrefixMap>,
) -> Result<RdfGraph, CodecError> {
    let format = syntax
        .format()
        .ok_or(CodecError::UnsupportedSyntax(syntax))?;

    let mut parser = RdfParser::from_format(format);
    if let Some(iri) = base_iri {
        parser = parser
            .with_base_iri(iri)
            .map_err(|error| CodecError::BaseIri {
                iri: iri.to_string(),
                message: error.to_string(),
            })?;
    }

    let mut reader = parser.for_reader(bytes);
    let mut triples = Graph::new();
    for quad in reader.by_ref() {
        let quad = quad.map_err(|error| CodecError::Parse {
            syntax,
            message: error.to_string(),
        })?;
        triples.insert(&Triple::from(quad));
    }

    let mut prefixes = seed.cloned().unwrap_or_default();
    for (name, iri) in reader.prefixes() {
        prefixes.insert(name.to_string(), iri.to_string());
    }

    Ok(RdfGraph::from_parts(triples, prefixes))
}

/// Serializes `graph` as `syntax`, declaring the graph's prefixes where the
/// syntax supports them.
pub fn encode(graph: &RdfGraph, syntax: RdfSyntax) -> Result<Vec<u8>, CodecError> {
    let format = syntax
        .format()
        .ok_or(CodecError::UnsupportedSyntax(syntax))?;

    let mut serializer = RdfSerializer::from_format(format);
    for (prefix, iri) in graph.prefixes() {
        serializer = serializer
            .with_prefix(prefix, iri)
            .map_err(|error| CodecError::Prefix {
                prefix: prefix.clone(),
                message: error.to_string(),
            })?;
    }

    let write_error = |source: std::io::Error| CodecError::Write { syntax, source };
    let mut writer = serializer.for_writer(Vec::new());
    for triple in graph.triples() {
        writer.serialize_triple(triple).map_err(write_error)?;
    }
    writer.finish().map_err(write_error)
}
