use super::results::{ValidationResult, build_report};
use super::shape::{Constraint, PropertyPath, Shape, Target, parse_shapes};
use super::{ConstraintEngine, EngineError};
use crate::rdf::RdfGraph;
use indexmap::{IndexMap, IndexSet};
use oxigraph::model::vocab::{rdf, rdfs, xsd};
use oxigraph::model::{
    Graph, Literal, LiteralRef, NamedNode, NamedNodeRef, NamedOrBlankNodeRef, Term, TermRef,
};
use std::cmp::Ordering;

/// In-process SHACL Core engine working directly on oxigraph graphs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreShaclEngine;

impl ConstraintEngine for CoreShaclEngine {
    fn evaluate(
        &self,
        data: &RdfGraph,
        shapes: &RdfGraph,
        validate_shapes: bool,
    ) -> Result<RdfGraph, EngineError> {
        let parsed = parse_shapes(shapes.triples())?;

        let combined;
        let graph = if validate_shapes {
            let mut union = data.clone();
            union.union_with(shapes.clone());
            combined = union;
            combined.triples()
        } else {
            data.triples()
        };

        let evaluator = Evaluator { data: graph };
        let mut results = Vec::new();
        for shape in &parsed {
            if shape.deactivated {
                continue;
            }
            for focus in evaluator.focus_nodes(shape) {
                evaluator.validate_node(shape, &focus, &mut results);
            }
        }

        tracing::debug!(
            shapes = parsed.len(),
            data_triples = graph.len(),
            results = results.len(),
            "shape evaluation finished"
        );
        Ok(build_report(&results, data.prefixes()))
    }
}

struct Evaluator<'g> {
    data: &'g Graph,
}

impl<'g> Evaluator<'g> {
    fn focus_nodes(&self, shape: &Shape) -> IndexSet<Term> {
        let mut nodes = IndexSet::new();
        for target in &shape.targets {
            match target {
                Target::Node(node) => {
                    nodes.insert(node.clone());
                }
                Target::Class(class) => nodes.extend(self.instances_of(class.as_ref())),
                Target::SubjectsOf(predicate) => nodes.extend(
                    self.data
                        .triples_for_predicate(predicate.as_ref())
                        .map(|triple| Term::from(triple.subject.into_owned())),
                ),
                Target::ObjectsOf(predicate) => nodes.extend(
                    self.data
                        .triples_for_predicate(predicate.as_ref())
                        .map(|triple| triple.object.into_owned()),
                ),
            }
        }
        nodes
    }

    fn validate_node<'s>(
        &self,
        shape: &'s Shape,
        focus: &Term,
        results: &mut Vec<ValidationResult<'s>>,
    ) {
        if shape.deactivated {
            return;
        }
        let values = match &shape.path {
            Some(spec) => {
                let mut values = IndexSet::new();
                self.walk(&spec.path, focus, &mut values);
                values
            }
            None => IndexSet::from([focus.clone()]),
        };

        for constraint in &shape.constraints {
            self.check(shape, constraint, focus, &values, results);
        }
        for property in &shape.properties {
            for value in &values {
                self.validate_node(property, value, results);
            }
        }
    }

    fn check<'s>(
        &self,
        shape: &'s Shape,
        constraint: &Constraint,
        focus: &Term,
        values: &IndexSet<Term>,
        results: &mut Vec<ValidationResult<'s>>,
    ) {
        let mut report =
            |value: Option<&Term>, result_path: Option<NamedNode>, default_message: String| {
                results.push(ValidationResult {
                    shape,
                    focus: focus.clone(),
                    value: value.cloned(),
                    result_path,
                    component: constraint.component(),
                    default_message,
                })
            };

        match constraint {
            Constraint::MinCount(min) => {
                if (values.len() as u64) < *min {
                    report(None, None, format!("Less than {min} values"));
                }
            }
            Constraint::MaxCount(max) => {
                if values.len() as u64 > *max {
                    report(None, None, format!("More than {max} values"));
                }
            }
            Constraint::HasValue(expected) => {
                if !values.contains(expected) {
                    report(None, None, format!("Missing expected value {expected}"));
                }
            }
            Constraint::UniqueLang => {
                let mut languages: IndexMap<&str, usize> = IndexMap::new();
                for value in values {
                    if let Term::Literal(literal) = value {
                        if let Some(language) = literal.language() {
                            *languages.entry(language).or_default() += 1;
                        }
                    }
                }
                for (language, count) in languages {
                    if count > 1 {
                        report(
                            None,
                            None,
                            format!("Language \"{language}\" is used by more than one value"),
                        );
                    }
                }
            }
            Constraint::Equals(predicate) => {
                let others = self.objects_of(focus, predicate.as_ref());
                for value in values.difference(&others) {
                    report(Some(value), None, format!("Value is not a value of {predicate}"));
                }
                for other in others.difference(values) {
                    report(Some(other), None, format!("Value of {predicate} is missing"));
                }
            }
            Constraint::Disjoint(predicate) => {
                let others = self.objects_of(focus, predicate.as_ref());
                for value in values.intersection(&others) {
                    report(Some(value), None, format!("Value is also a value of {predicate}"));
                }
            }
            Constraint::LessThan(predicate) | Constraint::LessThanOrEquals(predicate) => {
                let or_equal = matches!(constraint, Constraint::LessThanOrEquals(_));
                let others = self.objects_of(focus, predicate.as_ref());
                for value in values {
                    let in_order = others.iter().all(|other| match compare_terms(value, other) {
                        Some(Ordering::Less) => true,
                        Some(Ordering::Equal) => or_equal,
                        _ => false,
                    });
                    if !in_order {
                        let relation = if or_equal { "<=" } else { "<" };
                        report(
                            Some(value),
                            None,
                            format!("Value is not {relation} every value of {predicate}"),
                        );
                    }
                }
            }
            Constraint::Closed(allowed) => {
                for value in values {
                    let Some(subject) = as_subject(value) else {
                        continue;
                    };
                    for triple in self.data.triples_for_subject(subject) {
                        let predicate = triple.predicate.into_owned();
                        if !allowed.contains(&predicate) {
                            let message = format!("Predicate {predicate} is not allowed (closed shape)");
                            report(Some(&triple.object.into_owned()), Some(predicate), message);
                        }
                    }
                }
            }
            Constraint::QualifiedMinCount { shape: qualified, count } => {
                let conforming = self.count_conforming(qualified, values);
                if (conforming as u64) < *count {
                    report(
                        None,
                        None,
                        format!("Less than {count} values conform to {}", qualified.id),
                    );
                }
            }
            Constraint::QualifiedMaxCount { shape: qualified, count } => {
                let conforming = self.count_conforming(qualified, values);
                if conforming as u64 > *count {
                    report(
                        None,
                        None,
                        format!("More than {count} values conform to {}", qualified.id),
                    );
                }
            }
            Constraint::Node(inner) => {
                for value in values {
                    if !self.conforms_to(inner, value) {
                        report(Some(value), None, format!("Value does not conform to shape {}", inner.id));
                    }
                }
            }
            Constraint::Not(inner) => {
                for value in values {
                    if self.conforms_to(inner, value) {
                        report(Some(value), None, format!("Value conforms to shape {}", inner.id));
                    }
                }
            }
            Constraint::And(members) | Constraint::Or(members) | Constraint::Xone(members) => {
                for value in values {
                    let conforming = members
                        .iter()
                        .filter(|member| self.conforms_to(member, value))
                        .count();
                    let (passes, message) = match constraint {
                        Constraint::And(_) => (
                            conforming == members.len(),
                            "Value does not conform to every shape of sh:and",
                        ),
                        Constraint::Or(_) => {
                            (conforming > 0, "Value does not conform to any shape of sh:or")
                        }
                        _ => (
                            conforming == 1,
                            "Value does not conform to exactly one shape of sh:xone",
                        ),
                    };
                    if !passes {
                        report(Some(value), None, message.to_string());
                    }
                }
            }
            _ => {
                for value in values {
                    if let Some(message) = self.value_violation(constraint, value) {
                        report(Some(value), None, message);
                    }
                }
            }
        }
    }

    /// Whether `value` satisfies every constraint of `shape`, targets aside.
    fn conforms_to(&self, shape: &Shape, value: &Term) -> bool {
        let mut nested = Vec::new();
        self.validate_node(shape, value, &mut nested);
        nested.is_empty()
    }

    fn count_conforming(&self, shape: &Shape, values: &IndexSet<Term>) -> usize {
        values
            .iter()
            .filter(|value| self.conforms_to(shape, value))
            .count()
    }

    fn objects_of(&self, focus: &Term, predicate: NamedNodeRef<'_>) -> IndexSet<Term> {
        let mut objects = IndexSet::new();
        if let Some(subject) = as_subject(focus) {
            objects.extend(
                self.data
                    .objects_for_subject_predicate(subject, predicate)
                    .map(TermRef::into_owned),
            );
        }
        objects
    }

    /// Per-value components; `None` means the value passes.
    fn value_violation(&self, constraint: &Constraint, value: &Term) -> Option<String> {
        let passes = match constraint {
            Constraint::Datatype(datatype) => match value {
                Term::Literal(literal) => has_datatype(literal.as_ref(), datatype.as_ref()),
                _ => false,
            },
            Constraint::Class(class) => self.is_instance_of(value, class.as_ref()),
            Constraint::NodeKind(kind, _) => kind.matches(value),
            Constraint::Pattern { regex, .. } => text_of(value).is_some_and(|t| regex.is_match(t)),
            Constraint::MinLength(min) => {
                text_of(value).is_some_and(|t| t.chars().count() as u64 >= *min)
            }
            Constraint::MaxLength(max) => {
                text_of(value).is_some_and(|t| t.chars().count() as u64 <= *max)
            }
            Constraint::MinInclusive(bound) => matches!(
                compare(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Constraint::MaxInclusive(bound) => {
                matches!(compare(value, bound), Some(Ordering::Less | Ordering::Equal))
            }
            Constraint::MinExclusive(bound) => {
                matches!(compare(value, bound), Some(Ordering::Greater))
            }
            Constraint::MaxExclusive(bound) => {
                matches!(compare(value, bound), Some(Ordering::Less))
            }
            Constraint::In(allowed) => allowed.contains(value),
            Constraint::LanguageIn(ranges) => match value {
                Term::Literal(literal) => literal
                    .language()
                    .is_some_and(|tag| ranges.iter().any(|range| language_matches(tag, range))),
                _ => false,
            },
            // evaluated over the whole value set in `check`
            _ => true,
        };
        if passes {
            return None;
        }

        let message = match constraint {
            Constraint::Datatype(datatype) => format!("Value does not have datatype {datatype}"),
            Constraint::Class(class) => format!("Value does not have class {class}"),
            Constraint::NodeKind(_, kind) => format!("Value does not have node kind {kind}"),
            Constraint::Pattern { pattern, .. } => {
                format!("Value does not match pattern \"{pattern}\"")
            }
            Constraint::MinLength(min) => format!("Value has less than {min} characters"),
            Constraint::MaxLength(max) => format!("Value has more than {max} characters"),
            Constraint::MinInclusive(bound) => format!("Value is not >= {bound}"),
            Constraint::MaxInclusive(bound) => format!("Value is not <= {bound}"),
            Constraint::MinExclusive(bound) => format!("Value is not > {bound}"),
            Constraint::MaxExclusive(bound) => format!("Value is not < {bound}"),
            Constraint::In(_) => "Value is not in the list of allowed values".to_string(),
            Constraint::LanguageIn(ranges) => {
                format!("Language tag is not one of {}", ranges.join(", "))
            }
            _ => format!("Value violates {}", constraint.component()),
        };
        Some(message)
    }

    fn walk(&self, path: &PropertyPath, node: &Term, out: &mut IndexSet<Term>) {
        match path {
            PropertyPath::Predicate(predicate) => {
                if let Some(subject) = as_subject(node) {
                    out.extend(
                        self.data
                            .objects_for_subject_predicate(subject, predicate.as_ref())
                            .map(TermRef::into_owned),
                    );
                }
            }
            PropertyPath::Inverse(inner) => match inner.as_ref() {
                PropertyPath::Predicate(predicate) => out.extend(
                    self.data
                        .subjects_for_predicate_object(predicate.as_ref(), node.as_ref())
                        .map(|subject| Term::from(subject.into_owned())),
                ),
                other => self.walk(&other.inverted(), node, out),
            },
            PropertyPath::Sequence(steps) => {
                let mut current = IndexSet::from([node.clone()]);
                for step in steps {
                    let mut next = IndexSet::new();
                    for item in &current {
                        self.walk(step, item, &mut next);
                    }
                    current = next;
                }
                out.extend(current);
            }
            PropertyPath::Alternative(options) => {
                for option in options {
                    self.walk(option, node, out);
                }
            }
            PropertyPath::ZeroOrMore(inner) => {
                out.insert(node.clone());
                self.closure(inner, node, out);
            }
            PropertyPath::OneOrMore(inner) => self.closure(inner, node, out),
            PropertyPath::ZeroOrOne(inner) => {
                out.insert(node.clone());
                self.walk(inner, node, out);
            }
        }
    }

    /// Nodes reachable through one or more applications of `path`.
    fn closure(&self, path: &PropertyPath, start: &Term, out: &mut IndexSet<Term>) {
        let mut reached = IndexSet::new();
        let mut frontier = vec![start.clone()];
        while let Some(node) = frontier.pop() {
            let mut next = IndexSet::new();
            self.walk(path, &node, &mut next);
            for candidate in next {
                if reached.insert(candidate.clone()) {
                    frontier.push(candidate);
                }
            }
        }
        out.extend(reached);
    }

    /// `class` and every class declared a transitive `rdfs:subClassOf` it.
    fn subclasses_of(&self, class: NamedNodeRef<'_>) -> IndexSet<Term> {
        let mut classes = IndexSet::from([Term::from(class.into_owned())]);
        let mut index = 0;
        while let Some(current) = classes.get_index(index).cloned() {
            let children: Vec<Term> = self
                .data
                .subjects_for_predicate_object(rdfs::SUB_CLASS_OF, current.as_ref())
                .map(|subject| Term::from(subject.into_owned()))
                .collect();
            classes.extend(children);
            index += 1;
        }
        classes
    }

    fn instances_of(&self, class: NamedNodeRef<'_>) -> IndexSet<Term> {
        let mut instances = IndexSet::new();
        for class in self.subclasses_of(class) {
            instances.extend(
                self.data
                    .subjects_for_predicate_object(rdf::TYPE, class.as_ref())
                    .map(|subject| Term::from(subject.into_owned())),
            );
        }
        instances
    }

    fn is_instance_of(&self, node: &Term, class: NamedNodeRef<'_>) -> bool {
        let Some(subject) = as_subject(node) else {
            return false;
        };
        let mut pending: Vec<Term> = self
            .data
            .objects_for_subject_predicate(subject, rdf::TYPE)
            .map(TermRef::into_owned)
            .collect();
        let mut visited = IndexSet::new();
        while let Some(candidate) = pending.pop() {
            if candidate.as_ref() == TermRef::from(class) {
                return true;
            }
            if !visited.insert(candidate.clone()) {
                continue;
            }
            if let Some(parent_subject) = as_subject(&candidate) {
                pending.extend(
                    self.data
                        .objects_for_subject_predicate(parent_subject, rdfs::SUB_CLASS_OF)
                        .map(TermRef::into_owned),
                );
            }
        }
        false
    }
}

fn as_subject(term: &Term) -> Option<NamedOrBlankNodeRef<'_>> {
    as_subject_ref(term.as_ref())
}

fn as_subject_ref(term: TermRef<'_>) -> Option<NamedOrBlankNodeRef<'_>> {
    match term {
        TermRef::NamedNode(node) => Some(node.into()),
        TermRef::BlankNode(node) => Some(node.into()),
        _ => None,
    }
}

/// String form checked by pattern and length components. Blank nodes have none.
fn text_of(term: &Term) -> Option<&str> {
    match term {
        Term::NamedNode(node) => Some(node.as_str()),
        Term::Literal(literal) => Some(literal.value()),
        _ => None,
    }
}

const INTEGER_TYPES: &[NamedNodeRef<'static>] = &[
    xsd::INTEGER,
    xsd::LONG,
    xsd::INT,
    xsd::SHORT,
    xsd::BYTE,
    xsd::NON_NEGATIVE_INTEGER,
    xsd::POSITIVE_INTEGER,
    xsd::NEGATIVE_INTEGER,
    xsd::NON_POSITIVE_INTEGER,
    xsd::UNSIGNED_LONG,
    xsd::UNSIGNED_INT,
    xsd::UNSIGNED_SHORT,
    xsd::UNSIGNED_BYTE,
];

fn is_numeric(datatype: NamedNodeRef<'_>) -> bool {
    INTEGER_TYPES.contains(&datatype)
        || datatype == xsd::DECIMAL
        || datatype == xsd::DOUBLE
        || datatype == xsd::FLOAT
}

fn integer_bounds(datatype: NamedNodeRef<'_>) -> (i128, i128) {
    match datatype {
        d if d == xsd::LONG => (i64::MIN.into(), i64::MAX.into()),
        d if d == xsd::INT => (i32::MIN.into(), i32::MAX.into()),
        d if d == xsd::SHORT => (i16::MIN.into(), i16::MAX.into()),
        d if d == xsd::BYTE => (i8::MIN.into(), i8::MAX.into()),
        d if d == xsd::NON_NEGATIVE_INTEGER => (0, i128::MAX),
        d if d == xsd::POSITIVE_INTEGER => (1, i128::MAX),
        d if d == xsd::NEGATIVE_INTEGER => (i128::MIN, -1),
        d if d == xsd::NON_POSITIVE_INTEGER => (i128::MIN, 0),
        d if d == xsd::UNSIGNED_LONG => (0, u64::MAX.into()),
        d if d == xsd::UNSIGNED_INT => (0, u32::MAX.into()),
        d if d == xsd::UNSIGNED_SHORT => (0, u16::MAX.into()),
        d if d == xsd::UNSIGNED_BYTE => (0, u8::MAX.into()),
        _ => (i128::MIN, i128::MAX),
    }
}

fn parse_integer(lexical: &str) -> Option<i128> {
    let digits = lexical.strip_prefix('+').unwrap_or(lexical);
    if digits.is_empty() || digits == "-" {
        return None;
    }
    digits.parse().ok()
}

fn parse_decimal(lexical: &str) -> Option<f64> {
    let valid = lexical.chars().any(|c| c.is_ascii_digit())
        && lexical
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && (c == '+' || c == '-')))
        && lexical.matches('.').count() <= 1;
    if valid { lexical.parse().ok() } else { None }
}

fn parse_floating(lexical: &str) -> Option<f64> {
    match lexical {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other if other.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        other => other.parse().ok(),
    }
}

fn numeric_value(literal: LiteralRef<'_>) -> Option<f64> {
    let datatype = literal.datatype();
    if INTEGER_TYPES.contains(&datatype) {
        parse_integer(literal.value()).map(|n| n as f64)
    } else if datatype == xsd::DECIMAL {
        parse_decimal(literal.value())
    } else {
        parse_floating(literal.value())
    }
}

/// Datatype match plus a lexical check for the common XSD value spaces.
fn has_datatype(literal: LiteralRef<'_>, datatype: NamedNodeRef<'_>) -> bool {
    if literal.datatype() != datatype {
        return false;
    }
    let lexical = literal.value();
    if datatype == xsd::BOOLEAN {
        return matches!(lexical, "true" | "false" | "1" | "0");
    }
    if INTEGER_TYPES.contains(&datatype) {
        let (min, max) = integer_bounds(datatype);
        return parse_integer(lexical).is_some_and(|n| n >= min && n <= max);
    }
    if datatype == xsd::DECIMAL {
        return parse_decimal(lexical).is_some();
    }
    if datatype == xsd::DOUBLE || datatype == xsd::FLOAT {
        return parse_floating(lexical).is_some();
    }
    true
}

/// Basic filtering of RFC 4647, as SPARQL `langMatches` does it.
fn language_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    tag.eq_ignore_ascii_case(range)
        || (tag.len() > range.len()
            && tag.as_bytes()[range.len()] == b'-'
            && tag
                .get(..range.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(range)))
}

fn compare_terms(value: &Term, other: &Term) -> Option<Ordering> {
    match other {
        Term::Literal(other) => compare(value, other),
        _ => None,
    }
}

/// Orders a value against a range bound. Numbers compare by value, other
/// literals only against a bound of the same datatype, by lexical form.
fn compare(value: &Term, bound: &Literal) -> Option<Ordering> {
    let Term::Literal(value) = value else {
        return None;
    };
    let (value, bound) = (value.as_ref(), bound.as_ref());
    if is_numeric(value.datatype()) && is_numeric(bound.datatype()) {
        return numeric_value(value)?.partial_cmp(&numeric_value(bound)?);
    }
    if value.datatype() == bound.datatype() && value.language().is_none() {
        return Some(value.value().cmp(bound.value()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::vocab as sh;
    use crate::rdf::{RdfSyntax, decode};
    use oxigraph::model::TripleRef;

    const PREFIXES: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
    "#;

    fn turtle(body: &str) -> RdfGraph {
        decode(
            format!("{PREFIXES}\n{body}").as_bytes(),
            RdfSyntax::Turtle,
            None,
            None,
        )
        .expect("turtle")
    }

    fn run(data: &str, shapes: &str) -> RdfGraph {
        CoreShaclEngine
            .evaluate(&turtle(data), &turtle(shapes), false)
            .expect("evaluate")
    }

    fn conforms(report: &RdfGraph) -> bool {
        report
            .triples()
            .triples_for_predicate(sh::CONFORMS)
            .next()
            .map(|triple| triple.object.to_string() == Literal::from(true).to_string())
            .expect("sh:conforms")
    }

    fn components(report: &RdfGraph) -> Vec<String> {
        let mut found: Vec<String> = report
            .triples()
            .triples_for_predicate(sh::SOURCE_CONSTRAINT_COMPONENT)
            .map(|triple| triple.object.to_string())
            .collect();
        found.sort();
        found
    }

    fn result_count(report: &RdfGraph) -> usize {
        report.triples().triples_for_predicate(sh::RESULT).count()
    }

    const PERSON_SHAPE: &str = r#"
        ex:PersonShape a sh:NodeShape ;
            sh:targetClass ex:Person ;
            sh:property [ sh:path ex:name ; sh:minCount 1 ; sh:datatype xsd:string ] .
    "#;

    #[test]
    fn missing_property_yields_one_min_count_result() {
        let report = run("ex:alice a ex:Person .", PERSON_SHAPE);
        assert!(!conforms(&report));
        assert_eq!(result_count(&report), 1);
        assert_eq!(
            components(&report),
            vec![sh::MIN_COUNT_COMPONENT.to_string()]
        );
        assert_eq!(
            report.triples().triples_for_predicate(sh::VALUE).count(),
            0,
            "cardinality results carry no sh:value"
        );
    }

    #[test]
    fn conforming_data_reports_conforms_true() {
        let report = run("ex:alice a ex:Person ; ex:name \"Alice\" .", PERSON_SHAPE);
        assert!(conforms(&report));
        assert_eq!(result_count(&report), 0);
        assert!(report.contains(TripleRef::new(
            report
                .triples()
                .subjects_for_predicate_object(rdf::TYPE, sh::VALIDATION_REPORT)
                .next()
                .expect("report node"),
            rdf::TYPE,
            sh::VALIDATION_REPORT,
        )));
    }

    #[test]
    fn target_class_includes_subclass_instances() {
        let report = run(
            "ex:Student rdfs:subClassOf ex:Person . ex:bob a ex:Student .",
            PERSON_SHAPE,
        );
        assert_eq!(result_count(&report), 1);
        let focus = report
            .triples()
            .triples_for_predicate(sh::FOCUS_NODE)
            .next()
            .expect("focus")
            .object
            .into_owned();
        assert_eq!(
            focus,
            Term::from(NamedNode::new_unchecked("http://example.org/bob"))
        );
    }

    #[test]
    fn deactivated_shapes_are_skipped() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ; sh:deactivated true ;
                sh:property [ sh:path ex:p ; sh:minCount 1 ] .
        "#;
        assert!(conforms(&run("ex:a ex:q 1 .", shapes)));
    }

    #[test]
    fn value_components_report_offending_values() {
        let shapes = r#"
            ex:S sh:targetSubjectsOf ex:age ;
                sh:property [ sh:path ex:age ; sh:datatype xsd:integer ; sh:minInclusive 0 ; sh:maxInclusive 150 ] ;
                sh:property [ sh:path ex:code ; sh:pattern "^[A-Z]{3}$" ; sh:maxLength 3 ] ;
                sh:property [ sh:path ex:status ; sh:in ( "open" "closed" ) ] .
        "#;
        let data = r#"
            ex:a ex:age 200 ; ex:code "abcd" ; ex:status "pending" .
            ex:b ex:age 42.5 ; ex:code "ABC" ; ex:status "open" .
        "#;
        let report = run(data, shapes);
        assert_eq!(
            components(&report),
            vec![
                sh::DATATYPE_COMPONENT.to_string(),
                sh::IN_COMPONENT.to_string(),
                sh::MAX_INCLUSIVE_COMPONENT.to_string(),
                sh::MAX_LENGTH_COMPONENT.to_string(),
                sh::PATTERN_COMPONENT.to_string(),
            ]
        );
        assert!(report.triples().triples_for_predicate(sh::VALUE).count() >= 4);
    }

    #[test]
    fn custom_message_and_severity_are_reported() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ex:p ; sh:minCount 1 ; sh:severity sh:Warning ; sh:message "p is required"@en ] .
        "#;
        let report = run("ex:a ex:q 1 .", shapes);
        assert!(!conforms(&report), "warnings still make the report non-conforming");
        let severity = report
            .triples()
            .triples_for_predicate(sh::RESULT_SEVERITY)
            .next()
            .expect("severity")
            .object
            .into_owned();
        assert_eq!(severity, Term::from(sh::WARNING.into_owned()));
        let message = report
            .triples()
            .triples_for_predicate(sh::RESULT_MESSAGE)
            .next()
            .expect("message")
            .object
            .into_owned();
        assert_eq!(message, Term::from(Literal::new_language_tagged_literal_unchecked("p is required", "en")));
    }

    #[test]
    fn inverse_and_sequence_paths() {
        let shapes = r#"
            ex:S sh:targetNode ex:parent ;
                sh:property [ sh:path [ sh:inversePath ex:hasParent ] ; sh:minCount 2 ] ;
                sh:property [ sh:path ( [ sh:inversePath ex:hasParent ] ex:name ) ; sh:minCount 1 ] .
        "#;
        let report = run("ex:kid ex:hasParent ex:parent ; ex:name \"Kid\" .", shapes);
        assert_eq!(components(&report), vec![sh::MIN_COUNT_COMPONENT.to_string()]);
        let paths = report.triples().triples_for_predicate(sh::INVERSE_PATH).count();
        assert!(paths >= 1, "complex result paths are described in the report");
    }

    #[test]
    fn validate_shapes_evaluates_the_shapes_graph_as_data() {
        let shapes = r#"
            ex:Thing a ex:Person .
            ex:S sh:targetClass ex:Person ; sh:property [ sh:path ex:name ; sh:minCount 1 ] .
        "#;
        let engine = CoreShaclEngine;
        let data = turtle("");
        let shapes = turtle(shapes);
        let without = engine.evaluate(&data, &shapes, false).expect("evaluate");
        let with = engine.evaluate(&data, &shapes, true).expect("evaluate");
        assert!(conforms(&without));
        assert!(!conforms(&with));
    }

    #[test]
    fn unique_lang_and_has_value() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ex:label ; sh:uniqueLang true ] ;
                sh:property [ sh:path ex:kind ; sh:hasValue ex:Primary ] .
        "#;
        let report = run("ex:a ex:label \"a\"@en, \"b\"@en, \"c\"@fr ; ex:kind ex:Other .", shapes);
        assert_eq!(result_count(&report), 2);
        assert_eq!(
            components(&report),
            vec![
                sh::HAS_VALUE_COMPONENT.to_string(),
                sh::UNIQUE_LANG_COMPONENT.to_string(),
            ]
        );
    }

    #[test]
    fn literal_ranges() {
        let integer = Literal::new_typed_literal("5", xsd::INTEGER);
        let decimal = Literal::new_typed_literal("5.5", xsd::DECIMAL);
        assert_eq!(
            compare(&Term::from(integer.clone()), &decimal),
            Some(Ordering::Less)
        );
        let text = Literal::new_simple_literal("b");
        assert_eq!(compare(&Term::from(text), &integer), None);
        assert!(!has_datatype(
            Literal::new_typed_literal("300", xsd::BYTE).as_ref(),
            xsd::BYTE
        ));
    }

    #[test]
    fn node_and_not_reference_other_shapes() {
        let shapes = r#"
            ex:AddressShape sh:property [ sh:path ex:city ; sh:minCount 1 ] .
            ex:S sh:targetNode ex:a, ex:b ;
                sh:property [ sh:path ex:address ; sh:node ex:AddressShape ] ;
                sh:not [ sh:property [ sh:path ex:banned ; sh:minCount 1 ] ] .
        "#;
        let data = r#"
            ex:a ex:address [ ex:street "Main" ] .
            ex:b ex:address [ ex:city "Paris" ] ; ex:banned true .
        "#;
        let report = run(data, shapes);
        assert_eq!(result_count(&report), 2);
        assert_eq!(
            components(&report),
            vec![sh::NODE_COMPONENT.to_string(), sh::NOT_COMPONENT.to_string()]
        );
    }

    #[test]
    fn and_or_xone_count_conforming_members() {
        let shapes = r#"
            ex:HasName sh:property [ sh:path ex:name ; sh:minCount 1 ] .
            ex:HasEmail sh:property [ sh:path ex:email ; sh:minCount 1 ] .
            ex:And sh:targetNode ex:nameOnly ; sh:and ( ex:HasName ex:HasEmail ) .
            ex:Or sh:targetNode ex:neither ; sh:or ( ex:HasName ex:HasEmail ) .
            ex:Xone sh:targetNode ex:both ; sh:xone ( ex:HasName ex:HasEmail ) .
            ex:Fine sh:targetNode ex:nameOnly ; sh:xone ( ex:HasName ex:HasEmail ) .
        "#;
        let data = r#"
            ex:nameOnly ex:name "N" .
            ex:neither ex:other 1 .
            ex:both ex:name "B" ; ex:email "b@example.org" .
        "#;
        let report = run(data, shapes);
        assert_eq!(result_count(&report), 3);
        assert_eq!(
            components(&report),
            vec![
                sh::AND_COMPONENT.to_string(),
                sh::OR_COMPONENT.to_string(),
                sh::XONE_COMPONENT.to_string(),
            ]
        );
    }

    #[test]
    fn closed_shapes_reject_undeclared_predicates() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:closed true ;
                sh:ignoredProperties ( rdf:type ) ;
                sh:property [ sh:path ex:name ] .
        "#;
        let report = run("ex:a a ex:Thing ; ex:name \"A\" ; ex:nickname \"Al\" .", shapes);
        assert_eq!(components(&report), vec![sh::CLOSED_COMPONENT.to_string()]);
        let path = report
            .triples()
            .triples_for_predicate(sh::RESULT_PATH)
            .next()
            .expect("result path")
            .object
            .into_owned();
        assert_eq!(
            path,
            Term::from(NamedNode::new_unchecked("http://example.org/nickname"))
        );
    }

    #[test]
    fn language_in_matches_ranges() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ex:label ; sh:languageIn ( "en" "fr" ) ] .
        "#;
        let report = run(
            "ex:a ex:label \"colour\"@en-GB, \"couleur\"@fr, \"Farbe\"@de, \"plain\" .",
            shapes,
        );
        assert_eq!(result_count(&report), 2);
        assert_eq!(
            components(&report),
            vec![
                sh::LANGUAGE_IN_COMPONENT.to_string(),
                sh::LANGUAGE_IN_COMPONENT.to_string(),
            ]
        );
        assert!(language_matches("EN-gb", "en"));
        assert!(!language_matches("english", "en"));
        assert!(language_matches("de", "*"));
    }

    #[test]
    fn property_pair_components() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ex:given ; sh:equals ex:first ] ;
                sh:property [ sh:path ex:nick ; sh:disjoint ex:first ] ;
                sh:property [ sh:path ex:start ; sh:lessThan ex:end ] ;
                sh:property [ sh:path ex:low ; sh:lessThanOrEquals ex:high ] .
        "#;
        let data = r#"
            ex:a ex:given "Ann" ; ex:first "Ann" ;
                ex:nick "Ann" ;
                ex:start 10 ; ex:end 5 ;
                ex:low 3 ; ex:high 3 .
        "#;
        let report = run(data, shapes);
        assert_eq!(
            components(&report),
            vec![
                sh::DISJOINT_COMPONENT.to_string(),
                sh::LESS_THAN_COMPONENT.to_string(),
            ]
        );

        let report = run("ex:a ex:given \"Ann\" ; ex:first \"Anne\" .", shapes);
        assert_eq!(
            components(&report),
            vec![
                sh::EQUALS_COMPONENT.to_string(),
                sh::EQUALS_COMPONENT.to_string(),
            ]
        );
    }

    #[test]
    fn qualified_value_shape_counts_conforming_values() {
        let shapes = r#"
            ex:S sh:targetNode ex:team ;
                sh:property [
                    sh:path ex:member ;
                    sh:qualifiedValueShape [ sh:class ex:Lead ] ;
                    sh:qualifiedMinCount 1 ;
                    sh:qualifiedMaxCount 1 ;
                ] .
        "#;
        let none = run("ex:team ex:member ex:x . ex:x a ex:Dev .", shapes);
        assert_eq!(
            components(&none),
            vec![sh::QUALIFIED_MIN_COUNT_COMPONENT.to_string()]
        );
        let two = run(
            "ex:team ex:member ex:x, ex:y . ex:x a ex:Lead . ex:y a ex:Lead .",
            shapes,
        );
        assert_eq!(
            components(&two),
            vec![sh::QUALIFIED_MAX_COUNT_COMPONENT.to_string()]
        );
        assert!(conforms(&run("ex:team ex:member ex:x . ex:x a ex:Lead .", shapes)));
    }

    #[test]
    fn sparql_constraints_fail_instead_of_conforming() {
        let shapes = r#"
            ex:S sh:targetNode ex:a ;
                sh:sparql [ sh:select "SELECT $this WHERE { }" ] .
        "#;
        let err = CoreShaclEngine
            .evaluate(&turtle("ex:a ex:p 1 ."), &turtle(shapes), false)
            .expect_err("sparql is not evaluated");
        assert!(matches!(
            err,
            EngineError::Unsupported { ref feature, .. } if feature.contains("sparql")
        ));
    }
}
