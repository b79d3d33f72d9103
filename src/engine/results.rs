use super::shape::Shape;
use super::vocab as sh;
use crate::rdf::{PrefixMap, RdfGraph, SH_NAMESPACE, SH_PREFIX};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{BlankNode, Literal, NamedNode, NamedNodeRef, Term, TripleRef};

/// One violated constraint, tied to the shape that declared it.
#[derive(Debug)]
pub(crate) struct ValidationResult<'s> {
    pub shape: &'s Shape,
    pub focus: Term,
    pub value: Option<Term>,
    /// Replaces the shape's own path, for results about a single predicate
    pub result_path: Option<NamedNode>,
    pub component: NamedNodeRef<'static>,
    pub default_message: String,
}

/// Writes `results` as a single `sh:ValidationReport`. The report conforms
/// when there is nothing to report, whatever the severities involved.
pub(crate) fn build_report(results: &[ValidationResult<'_>], prefixes: &PrefixMap) -> RdfGraph {
    let mut graph = RdfGraph::new();
    graph.adopt_prefixes(prefixes);
    graph.set_prefix(SH_PREFIX, SH_NAMESPACE);

    let report = BlankNode::default();
    graph.insert(TripleRef::new(
        report.as_ref(),
        rdf::TYPE,
        sh::VALIDATION_REPORT,
    ));
    let conforms = Literal::from(results.is_empty());
    graph.insert(TripleRef::new(
        report.as_ref(),
        sh::CONFORMS,
        conforms.as_ref(),
    ));

    for result in results {
        let node = BlankNode::default();
        let subject = node.as_ref();
        graph.insert(TripleRef::new(report.as_ref(), sh::RESULT, subject));
        graph.insert(TripleRef::new(subject, rdf::TYPE, sh::VALIDATION_RESULT));
        graph.insert(TripleRef::new(
            subject,
            sh::FOCUS_NODE,
            result.focus.as_ref(),
        ));
        graph.insert(TripleRef::new(
            subject,
            sh::RESULT_SEVERITY,
            result.shape.severity.as_ref(),
        ));
        graph.insert(TripleRef::new(
            subject,
            sh::SOURCE_SHAPE,
            result.shape.id.as_ref(),
        ));
        graph.insert(TripleRef::new(
            subject,
            sh::SOURCE_CONSTRAINT_COMPONENT,
            result.component,
        ));

        if let Some(predicate) = &result.result_path {
            graph.insert(TripleRef::new(subject, sh::RESULT_PATH, predicate.as_ref()));
        } else if let Some(path) = &result.shape.path {
            graph.insert(TripleRef::new(subject, sh::RESULT_PATH, path.term.as_ref()));
            for triple in &path.description {
                graph.insert(triple);
            }
        }
        if let Some(value) = &result.value {
            graph.insert(TripleRef::new(subject, sh::VALUE, value.as_ref()));
        }

        if result.shape.messages.is_empty() {
            let message = Literal::new_simple_literal(&result.default_message);
            graph.insert(TripleRef::new(
                subject,
                sh::RESULT_MESSAGE,
                message.as_ref(),
            ));
        } else {
            for message in &result.shape.messages {
                graph.insert(TripleRef::new(
                    subject,
                    sh::RESULT_MESSAGE,
                    message.as_ref(),
                ));
            }
        }
    }

    graph
}
