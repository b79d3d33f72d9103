use crate::rdf::{RdfGraph, SH_NAMESPACE, SH_PREFIX};

/// Unions per-shape-file reports into one graph.
///
/// The result holds every triple of every input and nothing else. Prefixes
/// are unioned with the first binding of a name winning, and `sh` is bound to
/// the SHACL namespace exactly once.
pub fn merge_reports(reports: impl IntoIterator<Item = RdfGraph>) -> RdfGraph {
    let mut merged = RdfGraph::new();
    for report in reports {
        merged.union_with(report);
    }
    merged.set_prefix(SH_PREFIX, SH_NAMESPACE);
    merged
}
