//! owl:imports resolution for request content.

use crate::input::{ContentFetcher, MaterializeError};
use crate::rdf::{CodecError, RdfGraph, decode, select_syntax};
use indexmap::IndexSet;
use oxigraph::model::{Graph, NamedNodeRef, TermRef};
use reqwest::Url;
use std::path::Path;
use thiserror::Error;

pub const OWL_IMPORTS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#imports");

#[derive(Debug, Error)]
enum ImportError {
    #[error("not a fetchable IRI: {0}")]
    Iri(String),

    #[error(transparent)]
    Fetch(#[from] MaterializeError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Every `owl:imports` target of a graph, in document order.
pub fn import_targets(graph: &Graph) -> IndexSet<String> {
    graph
        .triples_for_predicate(OWL_IMPORTS)
        .filter_map(|triple| match triple.object {
            TermRef::NamedNode(iri) => Some(iri.as_str().to_string()),
            _ => None,
        })
        .collect()
}

/// Follows the imports of `data` breadth first, at most `max_depth` levels
/// deep, and returns the union of everything that could be loaded.
///
/// Targets that cannot be fetched or parsed are logged and skipped. Each IRI
/// is loaded at most once, which also breaks import cycles.
pub async fn resolve_imports(
    data: &RdfGraph,
    fetcher: &ContentFetcher,
    max_depth: usize,
) -> RdfGraph {
    let mut imported = RdfGraph::new();
    let mut visited: IndexSet<String> = IndexSet::new();
    let mut frontier = import_targets(data.triples());

    for depth in 1..=max_depth {
        if frontier.is_empty() {
            break;
        }
        let mut next = IndexSet::new();
        for iri in frontier {
            if !visited.insert(iri.clone()) {
                continue;
            }
            match load(&iri, fetcher).await {
                Ok(graph) => {
                    tracing::info!(import = %iri, depth, triples = graph.len(), "loaded owl:imports target");
                    next.extend(import_targets(graph.triples()));
                    imported.union_with(graph);
                }
                Err(error) => {
                    tracing::warn!(import = %iri, depth, error = %error, "skipping owl:imports target");
                }
            }
        }
        frontier = next;
    }

    let pending = frontier.iter().filter(|iri| !visited.contains(*iri)).count();
    if pending > 0 {
        tracing::warn!(
            max_depth,
            pending,
            "owl:imports depth limit reached; remaining imports ignored"
        );
    }
    imported
}

async fn load(iri: &str, fetcher: &ContentFetcher) -> Result<RdfGraph, ImportError> {
    let url = Url::parse(iri).map_err(|_| ImportError::Iri(iri.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ImportError::Iri(iri.to_string()));
    }
    let fetched = fetcher.fetch(&url).await?;
    let extension = Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str());
    let syntax = select_syntax(fetched.media_type.as_deref(), extension)?;
    Ok(decode(&fetched.bytes, syntax, Some(iri), None)?)
}
