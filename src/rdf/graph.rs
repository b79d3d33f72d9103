use indexmap::IndexMap;
use oxigraph::model::{Graph, Triple, TripleRef};

/// Prefix name to namespace IRI, in insertion order.
pub type PrefixMap = IndexMap<String, String>;

/// A set of triples together with the prefixes used to render it.
///
/// Prefixes are a display aid only. Two graphs with the same triples are the
/// same data regardless of their prefix maps.
#[derive(Debug, Clone, Default)]
pub struct RdfGraph {
    triples: Graph,
    prefixes: PrefixMap,
}

impl RdfGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(triples: Graph, prefixes: PrefixMap) -> Self {
        Self { triples, prefixes }
    }

    pub fn triples(&self) -> &Graph {
        &self.triples
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn insert<'a>(&mut self, triple: impl Into<TripleRef<'a>>) -> bool {
        self.triples.insert(triple)
    }

    pub fn contains<'a>(&self, triple: impl Into<TripleRef<'a>>) -> bool {
        self.triples.contains(triple)
    }

    /// Binds `prefix` to `iri`, replacing any previous binding of that prefix.
    pub fn set_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Adds every binding from `prefixes` that this graph does not already define.
    pub fn adopt_prefixes(&mut self, prefixes: &PrefixMap) {
        for (prefix, iri) in prefixes {
            self.prefixes
                .entry(prefix.clone())
                .or_insert_with(|| iri.clone());
        }
    }

    /// Moves all triples of `other` into this graph and adopts its prefixes.
    pub fn union_with(&mut self, other: RdfGraph) {
        let RdfGraph { triples, prefixes } = other;
        for triple in &triples {
            self.triples.insert(triple);
        }
        self.adopt_prefixes(&prefixes);
    }

    pub fn to_triples(&self) -> Vec<Triple> {
        self.triples.iter().map(TripleRef::into_owned).collect()
    }
}
