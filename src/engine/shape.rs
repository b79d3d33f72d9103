//! Reads node and property shapes out of a shapes graph.

use super::EngineError;
use super::vocab as sh;
use crate::rdf::SH_NAMESPACE;
use indexmap::IndexSet;
use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{
    Graph, Literal, LiteralRef, NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef,
    Term, TermRef, Triple, TripleRef,
};
use regex::Regex;

const MAX_LIST_LENGTH: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyPath {
    Predicate(NamedNode),
    Inverse(Box<PropertyPath>),
    Sequence(Vec<PropertyPath>),
    Alternative(Vec<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
    ZeroOrOne(Box<PropertyPath>),
}

impl PropertyPath {
    /// The same path walked backwards.
    pub fn inverted(&self) -> PropertyPath {
        match self {
            PropertyPath::Predicate(_) => PropertyPath::Inverse(Box::new(self.clone())),
            PropertyPath::Inverse(inner) => (**inner).clone(),
            PropertyPath::Sequence(steps) => {
                PropertyPath::Sequence(steps.iter().rev().map(PropertyPath::inverted).collect())
            }
            PropertyPath::Alternative(options) => {
                PropertyPath::Alternative(options.iter().map(PropertyPath::inverted).collect())
            }
            PropertyPath::ZeroOrMore(inner) => PropertyPath::ZeroOrMore(Box::new(inner.inverted())),
            PropertyPath::OneOrMore(inner) => PropertyPath::OneOrMore(Box::new(inner.inverted())),
            PropertyPath::ZeroOrOne(inner) => PropertyPath::ZeroOrOne(Box::new(inner.inverted())),
        }
    }
}

/// A parsed `sh:path` plus the shapes-graph triples describing it, so the
/// report can reproduce complex paths in `sh:resultPath`.
#[derive(Debug, Clone)]
pub struct PathSpec {
    pub path: PropertyPath,
    pub term: Term,
    pub description: Vec<Triple>,
}

#[derive(Debug, Clone)]
pub enum Target {
    Node(Term),
    Class(NamedNode),
    SubjectsOf(NamedNode),
    ObjectsOf(NamedNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        let kind = match iri {
            i if i == sh::IRI => NodeKind::Iri,
            i if i == sh::BLANK_NODE => NodeKind::BlankNode,
            i if i == sh::LITERAL => NodeKind::Literal,
            i if i == sh::BLANK_NODE_OR_IRI => NodeKind::BlankNodeOrIri,
            i if i == sh::BLANK_NODE_OR_LITERAL => NodeKind::BlankNodeOrLiteral,
            i if i == sh::IRI_OR_LITERAL => NodeKind::IriOrLiteral,
            _ => return None,
        };
        Some(kind)
    }

    pub fn matches(self, term: &Term) -> bool {
        let (iri, blank, literal) = match term {
            Term::NamedNode(_) => (true, false, false),
            Term::BlankNode(_) => (false, true, false),
            Term::Literal(_) => (false, false, true),
            #[allow(unreachable_patterns)]
            _ => (false, false, false),
        };
        match self {
            NodeKind::Iri => iri,
            NodeKind::BlankNode => blank,
            NodeKind::Literal => literal,
            NodeKind::BlankNodeOrIri => blank || iri,
            NodeKind::BlankNodeOrLiteral => blank || literal,
            NodeKind::IriOrLiteral => iri || literal,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Constraint {
    MinCount(u64),
    MaxCount(u64),
    Datatype(NamedNode),
    Class(NamedNode),
    NodeKind(NodeKind, NamedNode),
    Pattern { regex: Regex, pattern: String },
    MinLength(u64),
    MaxLength(u64),
    MinInclusive(Literal),
    MaxInclusive(Literal),
    MinExclusive(Literal),
    MaxExclusive(Literal),
    In(Vec<Term>),
    HasValue(Term),
    UniqueLang,
    /// Language ranges, matched the way SPARQL `langMatches` does
    LanguageIn(Vec<String>),
    Equals(NamedNode),
    Disjoint(NamedNode),
    LessThan(NamedNode),
    LessThanOrEquals(NamedNode),
    Node(Box<Shape>),
    And(Vec<Shape>),
    Or(Vec<Shape>),
    Not(Box<Shape>),
    Xone(Vec<Shape>),
    /// Predicates a focus node may use: direct property paths plus
    /// `sh:ignoredProperties`
    Closed(IndexSet<NamedNode>),
    QualifiedMinCount { shape: Box<Shape>, count: u64 },
    QualifiedMaxCount { shape: Box<Shape>, count: u64 },
}

impl Constraint {
    pub fn component(&self) -> NamedNodeRef<'static> {
        match self {
            Constraint::MinCount(_) => sh::MIN_COUNT_COMPONENT,
            Constraint::MaxCount(_) => sh::MAX_COUNT_COMPONENT,
            Constraint::Datatype(_) => sh::DATATYPE_COMPONENT,
            Constraint::Class(_) => sh::CLASS_COMPONENT,
            Constraint::NodeKind(..) => sh::NODE_KIND_COMPONENT,
            Constraint::Pattern { .. } => sh::PATTERN_COMPONENT,
            Constraint::MinLength(_) => sh::MIN_LENGTH_COMPONENT,
            Constraint::MaxLength(_) => sh::MAX_LENGTH_COMPONENT,
            Constraint::MinInclusive(_) => sh::MIN_INCLUSIVE_COMPONENT,
            Constraint::MaxInclusive(_) => sh::MAX_INCLUSIVE_COMPONENT,
            Constraint::MinExclusive(_) => sh::MIN_EXCLUSIVE_COMPONENT,
            Constraint::MaxExclusive(_) => sh::MAX_EXCLUSIVE_COMPONENT,
            Constraint::In(_) => sh::IN_COMPONENT,
            Constraint::HasValue(_) => sh::HAS_VALUE_COMPONENT,
            Constraint::UniqueLang => sh::UNIQUE_LANG_COMPONENT,
            Constraint::LanguageIn(_) => sh::LANGUAGE_IN_COMPONENT,
            Constraint::Equals(_) => sh::EQUALS_COMPONENT,
            Constraint::Disjoint(_) => sh::DISJOINT_COMPONENT,
            Constraint::LessThan(_) => sh::LESS_THAN_COMPONENT,
            Constraint::LessThanOrEquals(_) => sh::LESS_THAN_OR_EQUALS_COMPONENT,
            Constraint::Node(_) => sh::NODE_COMPONENT,
            Constraint::And(_) => sh::AND_COMPONENT,
            Constraint::Or(_) => sh::OR_COMPONENT,
            Constraint::Not(_) => sh::NOT_COMPONENT,
            Constraint::Xone(_) => sh::XONE_COMPONENT,
            Constraint::Closed(_) => sh::CLOSED_COMPONENT,
            Constraint::QualifiedMinCount { .. } => sh::QUALIFIED_MIN_COUNT_COMPONENT,
            Constraint::QualifiedMaxCount { .. } => sh::QUALIFIED_MAX_COUNT_COMPONENT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Shape {
    pub id: NamedOrBlankNode,
    pub targets: Vec<Target>,
    /// Present for property shapes
    pub path: Option<PathSpec>,
    pub severity: NamedNode,
    pub messages: Vec<Term>,
    pub deactivated: bool,
    pub constraints: Vec<Constraint>,
    pub properties: Vec<Shape>,
}

/// SHACL parameters a shape may carry. Any other term of the SHACL namespace
/// on a shape node fails compilation.
const SHAPE_PARAMETERS: &[NamedNodeRef<'static>] = &[
    sh::TARGET_NODE,
    sh::TARGET_CLASS,
    sh::TARGET_SUBJECTS_OF,
    sh::TARGET_OBJECTS_OF,
    sh::PATH,
    sh::PROPERTY,
    sh::DEACTIVATED,
    sh::SEVERITY,
    sh::MESSAGE,
    sh::NAME,
    sh::DESCRIPTION,
    sh::ORDER,
    sh::GROUP,
    sh::DEFAULT_VALUE,
    sh::MIN_COUNT,
    sh::MAX_COUNT,
    sh::DATATYPE,
    sh::CLASS,
    sh::NODE_KIND,
    sh::PATTERN,
    sh::FLAGS,
    sh::MIN_LENGTH,
    sh::MAX_LENGTH,
    sh::MIN_INCLUSIVE,
    sh::MAX_INCLUSIVE,
    sh::MIN_EXCLUSIVE,
    sh::MAX_EXCLUSIVE,
    sh::IN,
    sh::HAS_VALUE,
    sh::UNIQUE_LANG,
    sh::LANGUAGE_IN,
    sh::EQUALS,
    sh::DISJOINT,
    sh::LESS_THAN,
    sh::LESS_THAN_OR_EQUALS,
    sh::NODE,
    sh::AND,
    sh::OR,
    sh::NOT,
    sh::XONE,
    sh::CLOSED,
    sh::IGNORED_PROPERTIES,
    sh::QUALIFIED_VALUE_SHAPE,
    sh::QUALIFIED_MIN_COUNT,
    sh::QUALIFIED_MAX_COUNT,
    sh::QUALIFIED_VALUE_SHAPES_DISJOINT,
];

/// Every shape that selects focus nodes on its own, with the property shapes
/// it references resolved recursively.
pub fn parse_shapes(graph: &Graph) -> Result<Vec<Shape>, EngineError> {
    let mut roots: IndexSet<NamedOrBlankNode> = IndexSet::new();
    for predicate in [
        sh::TARGET_NODE,
        sh::TARGET_CLASS,
        sh::TARGET_SUBJECTS_OF,
        sh::TARGET_OBJECTS_OF,
    ] {
        for triple in graph.triples_for_predicate(predicate) {
            roots.insert(triple.subject.into_owned());
        }
    }
    for class_marker in [rdfs::CLASS, sh::OWL_CLASS] {
        for subject in graph.subjects_for_predicate_object(rdf::TYPE, class_marker) {
            if is_shape(graph, subject) {
                roots.insert(subject.into_owned());
            }
        }
    }

    let mut parser = ShapeParser {
        graph,
        stack: Vec::new(),
    };
    let mut shapes = Vec::with_capacity(roots.len());
    for root in &roots {
        if let Some(shape) = parser.parse(root.as_ref())? {
            shapes.push(shape);
        }
    }
    Ok(shapes)
}

fn is_shape(graph: &Graph, node: NamedOrBlankNodeRef<'_>) -> bool {
    graph.contains(TripleRef::new(node, rdf::TYPE, sh::NODE_SHAPE))
        || graph.contains(TripleRef::new(node, rdf::TYPE, sh::PROPERTY_SHAPE))
}

fn as_node(term: TermRef<'_>) -> Option<NamedOrBlankNodeRef<'_>> {
    match term {
        TermRef::NamedNode(node) => Some(node.into()),
        TermRef::BlankNode(node) => Some(node.into()),
        _ => None,
    }
}

struct ShapeParser<'g> {
    graph: &'g Graph,
    stack: Vec<NamedOrBlankNode>,
}

impl<'g> ShapeParser<'g> {
    fn parse(&mut self, id: NamedOrBlankNodeRef<'_>) -> Result<Option<Shape>, EngineError> {
        let owned = id.into_owned();
        if self.stack.contains(&owned) {
            tracing::debug!(shape = %owned, "skipping recursive shape reference");
            return Ok(None);
        }
        self.stack.push(owned.clone());
        let shape = self.parse_body(owned);
        self.stack.pop();
        shape.map(Some)
    }

    fn parse_body(&mut self, id: NamedOrBlankNode) -> Result<Shape, EngineError> {
        let node = id.as_ref();
        let graph = self.graph;
        check_parameters(graph, &id)?;

        let mut targets = Vec::new();
        for term in self.objects(node, sh::TARGET_NODE) {
            targets.push(Target::Node(term.into_owned()));
        }
        for class in self.named_objects(node, sh::TARGET_CLASS) {
            targets.push(Target::Class(class));
        }
        if let NamedOrBlankNodeRef::NamedNode(named) = node {
            let implicit = graph.contains(TripleRef::new(node, rdf::TYPE, rdfs::CLASS))
                || graph.contains(TripleRef::new(node, rdf::TYPE, sh::OWL_CLASS));
            if implicit {
                targets.push(Target::Class(named.into_owned()));
            }
        }
        for predicate in self.named_objects(node, sh::TARGET_SUBJECTS_OF) {
            targets.push(Target::SubjectsOf(predicate));
        }
        for predicate in self.named_objects(node, sh::TARGET_OBJECTS_OF) {
            targets.push(Target::ObjectsOf(predicate));
        }

        let path = match graph.object_for_subject_predicate(node, sh::PATH) {
            Some(term) => Some(PathSpec {
                path: self.parse_path(&id, term, 0)?,
                term: term.into_owned(),
                description: describe(graph, term),
            }),
            None => None,
        };

        let severity = self
            .named_objects(node, sh::SEVERITY)
            .into_iter()
            .next()
            .unwrap_or_else(|| sh::VIOLATION.into_owned());
        let messages = self
            .objects(node, sh::MESSAGE)
            .into_iter()
            .filter(|term| matches!(term, TermRef::Literal(_)))
            .map(TermRef::into_owned)
            .collect();
        let deactivated = self
            .literal(node, sh::DEACTIVATED)
            .is_some_and(|value| is_true(value));

        let mut constraints = self.parse_constraints(&id)?;

        let mut properties = Vec::new();
        for term in self.objects(node, sh::PROPERTY) {
            let Some(property_node) = as_node(term) else {
                return Err(invalid(&id, "sh:property must reference a shape node"));
            };
            if let Some(property) = self.parse(property_node)? {
                if property.path.is_none() {
                    return Err(invalid(&property.id, "property shape without sh:path"));
                }
                properties.push(property);
            }
        }

        if self.literal(node, sh::CLOSED).is_some_and(|value| is_true(value)) {
            let mut allowed: IndexSet<NamedNode> = properties
                .iter()
                .filter_map(|property| match property.path.as_ref().map(|spec| &spec.path) {
                    Some(PropertyPath::Predicate(predicate)) => Some(predicate.clone()),
                    _ => None,
                })
                .collect();
            if let Some(head) = graph.object_for_subject_predicate(node, sh::IGNORED_PROPERTIES) {
                for ignored in self.parse_list(&id, head)? {
                    match ignored {
                        Term::NamedNode(predicate) => {
                            allowed.insert(predicate);
                        }
                        _ => return Err(invalid(&id, "sh:ignoredProperties must list IRIs")),
                    }
                }
            }
            constraints.push(Constraint::Closed(allowed));
        }

        Ok(Shape {
            id,
            targets,
            path,
            severity,
            messages,
            deactivated,
            constraints,
            properties,
        })
    }

    fn parse_constraints(&mut self, id: &NamedOrBlankNode) -> Result<Vec<Constraint>, EngineError> {
        let node = id.as_ref();
        let mut constraints = Vec::new();

        if let Some(count) = self.integer(id, sh::MIN_COUNT)? {
            constraints.push(Constraint::MinCount(count));
        }
        if let Some(count) = self.integer(id, sh::MAX_COUNT)? {
            constraints.push(Constraint::MaxCount(count));
        }
        for datatype in self.named_objects(node, sh::DATATYPE) {
            constraints.push(Constraint::Datatype(datatype));
        }
        for class in self.named_objects(node, sh::CLASS) {
            constraints.push(Constraint::Class(class));
        }
        for kind in self.named_objects(node, sh::NODE_KIND) {
            let parsed = NodeKind::from_iri(kind.as_ref())
                .ok_or_else(|| invalid(id, format!("unknown sh:nodeKind {kind}")))?;
            constraints.push(Constraint::NodeKind(parsed, kind));
        }
        if let Some(pattern) = self.literal(node, sh::PATTERN) {
            let flags = self
                .literal(node, sh::FLAGS)
                .map(|flags| flags.value().to_string())
                .unwrap_or_default();
            constraints.push(compile_pattern(id, pattern.value(), &flags)?);
        }
        if let Some(length) = self.integer(id, sh::MIN_LENGTH)? {
            constraints.push(Constraint::MinLength(length));
        }
        if let Some(length) = self.integer(id, sh::MAX_LENGTH)? {
            constraints.push(Constraint::MaxLength(length));
        }

        let bounds: [(NamedNodeRef<'static>, fn(Literal) -> Constraint); 4] = [
            (sh::MIN_INCLUSIVE, Constraint::MinInclusive),
            (sh::MAX_INCLUSIVE, Constraint::MaxInclusive),
            (sh::MIN_EXCLUSIVE, Constraint::MinExclusive),
            (sh::MAX_EXCLUSIVE, Constraint::MaxExclusive),
        ];
        for (predicate, build) in bounds {
            if let Some(bound) = self.literal(node, predicate) {
                constraints.push(build(bound.into_owned()));
            }
        }

        if let Some(head) = self.graph.object_for_subject_predicate(node, sh::IN) {
            constraints.push(Constraint::In(self.parse_list(id, head)?));
        }
        for value in self.objects(node, sh::HAS_VALUE) {
            constraints.push(Constraint::HasValue(value.into_owned()));
        }
        if self.literal(node, sh::UNIQUE_LANG).is_some_and(|value| is_true(value)) {
            constraints.push(Constraint::UniqueLang);
        }
        if let Some(head) = self.graph.object_for_subject_predicate(node, sh::LANGUAGE_IN) {
            let ranges = self
                .parse_list(id, head)?
                .into_iter()
                .map(|range| match range {
                    Term::Literal(literal) => Ok(literal.value().to_string()),
                    _ => Err(invalid(id, "sh:languageIn must list literals")),
                })
                .collect::<Result<Vec<_>, _>>()?;
            constraints.push(Constraint::LanguageIn(ranges));
        }

        let pairs: [(NamedNodeRef<'static>, fn(NamedNode) -> Constraint); 4] = [
            (sh::EQUALS, Constraint::Equals),
            (sh::DISJOINT, Constraint::Disjoint),
            (sh::LESS_THAN, Constraint::LessThan),
            (sh::LESS_THAN_OR_EQUALS, Constraint::LessThanOrEquals),
        ];
        for (predicate, build) in pairs {
            for other in self.named_objects(node, predicate) {
                constraints.push(build(other));
            }
        }

        for term in self.objects(node, sh::NODE) {
            constraints.push(Constraint::Node(Box::new(self.reference(id, term)?)));
        }
        for term in self.objects(node, sh::NOT) {
            constraints.push(Constraint::Not(Box::new(self.reference(id, term)?)));
        }
        let lists: [(NamedNodeRef<'static>, fn(Vec<Shape>) -> Constraint); 3] = [
            (sh::AND, Constraint::And),
            (sh::OR, Constraint::Or),
            (sh::XONE, Constraint::Xone),
        ];
        for (predicate, build) in lists {
            for head in self.objects(node, predicate) {
                let members = self
                    .parse_list(id, head)?
                    .iter()
                    .map(|member| self.reference(id, member.as_ref()))
                    .collect::<Result<Vec<_>, _>>()?;
                constraints.push(build(members));
            }
        }

        if let Some(term) = self.graph.object_for_subject_predicate(node, sh::QUALIFIED_VALUE_SHAPE) {
            if self
                .literal(node, sh::QUALIFIED_VALUE_SHAPES_DISJOINT)
                .is_some_and(|value| is_true(value))
            {
                return Err(unsupported(id, sh::QUALIFIED_VALUE_SHAPES_DISJOINT));
            }
            let qualified = self.reference(id, term)?;
            let min = self.integer(id, sh::QUALIFIED_MIN_COUNT)?;
            let max = self.integer(id, sh::QUALIFIED_MAX_COUNT)?;
            if min.is_none() && max.is_none() {
                return Err(invalid(
                    id,
                    "sh:qualifiedValueShape needs sh:qualifiedMinCount or sh:qualifiedMaxCount",
                ));
            }
            if let Some(count) = min {
                constraints.push(Constraint::QualifiedMinCount {
                    shape: Box::new(qualified.clone()),
                    count,
                });
            }
            if let Some(count) = max {
                constraints.push(Constraint::QualifiedMaxCount {
                    shape: Box::new(qualified),
                    count,
                });
            }
        }

        Ok(constraints)
    }

    /// Parses a shape used as a constraint parameter. A shape that refers
    /// back to one of its own ancestors cannot be evaluated and is rejected.
    fn reference(
        &mut self,
        owner: &NamedOrBlankNode,
        term: TermRef<'_>,
    ) -> Result<Shape, EngineError> {
        let node = as_node(term)
            .ok_or_else(|| invalid(owner, "a shape reference must be an IRI or a blank node"))?;
        self.parse(node)?.ok_or_else(|| EngineError::Unsupported {
            shape: owner.to_string(),
            feature: format!("the recursive shape reference {term}"),
        })
    }

    fn parse_path(
        &self,
        shape: &NamedOrBlankNode,
        term: TermRef<'_>,
        depth: usize,
    ) -> Result<PropertyPath, EngineError> {
        if depth > 32 {
            return Err(invalid(shape, "sh:path nesting is too deep"));
        }
        let node = match term {
            TermRef::NamedNode(predicate) => {
                return Ok(PropertyPath::Predicate(predicate.into_owned()));
            }
            TermRef::BlankNode(node) => NamedOrBlankNodeRef::from(node),
            _ => return Err(invalid(shape, "sh:path must be an IRI or a blank node")),
        };

        let graph = self.graph;
        let nested = |predicate| graph.object_for_subject_predicate(node, predicate);
        if let Some(inner) = nested(sh::INVERSE_PATH) {
            return Ok(PropertyPath::Inverse(Box::new(
                self.parse_path(shape, inner, depth + 1)?,
            )));
        }
        if let Some(list) = nested(sh::ALTERNATIVE_PATH) {
            let options = self
                .parse_list(shape, list)?
                .iter()
                .map(|option| self.parse_path(shape, option.as_ref(), depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PropertyPath::Alternative(options));
        }
        if let Some(inner) = nested(sh::ZERO_OR_MORE_PATH) {
            let inner = self.parse_path(shape, inner, depth + 1)?;
            return Ok(PropertyPath::ZeroOrMore(Box::new(inner)));
        }
        if let Some(inner) = nested(sh::ONE_OR_MORE_PATH) {
            let inner = self.parse_path(shape, inner, depth + 1)?;
            return Ok(PropertyPath::OneOrMore(Box::new(inner)));
        }
        if let Some(inner) = nested(sh::ZERO_OR_ONE_PATH) {
            let inner = self.parse_path(shape, inner, depth + 1)?;
            return Ok(PropertyPath::ZeroOrOne(Box::new(inner)));
        }
        if nested(rdf::FIRST).is_some() {
            let steps = self
                .parse_list(shape, term)?
                .iter()
                .map(|step| self.parse_path(shape, step.as_ref(), depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PropertyPath::Sequence(steps));
        }
        Err(invalid(shape, "unsupported sh:path expression"))
    }

    fn parse_list(
        &self,
        shape: &NamedOrBlankNode,
        head: TermRef<'_>,
    ) -> Result<Vec<Term>, EngineError> {
        let mut values = Vec::new();
        let mut current = head.into_owned();
        while current.as_ref() != TermRef::from(rdf::NIL) {
            if values.len() > MAX_LIST_LENGTH {
                return Err(invalid(shape, "RDF list is too long or cyclic"));
            }
            let cell = as_node(current.as_ref())
                .ok_or_else(|| invalid(shape, "malformed RDF list"))?
                .into_owned();
            let first = self
                .graph
                .object_for_subject_predicate(cell.as_ref(), rdf::FIRST)
                .ok_or_else(|| invalid(shape, "RDF list cell without rdf:first"))?;
            values.push(first.into_owned());
            current = self
                .graph
                .object_for_subject_predicate(cell.as_ref(), rdf::REST)
                .ok_or_else(|| invalid(shape, "RDF list cell without rdf:rest"))?
                .into_owned();
        }
        Ok(values)
    }

    fn objects<'a>(
        &self,
        node: NamedOrBlankNodeRef<'a>,
        predicate: NamedNodeRef<'a>,
    ) -> Vec<TermRef<'a>>
    where
        'g: 'a,
    {
        let graph: &'a Graph = self.graph;
        graph.objects_for_subject_predicate(node, predicate).collect()
    }

    fn named_objects(
        &self,
        node: NamedOrBlankNodeRef<'_>,
        predicate: NamedNodeRef<'_>,
    ) -> Vec<NamedNode> {
        self.objects(node, predicate)
            .into_iter()
            .filter_map(|term| match term {
                TermRef::NamedNode(named) => Some(named.into_owned()),
                _ => None,
            })
            .collect()
    }

    fn literal<'a>(
        &self,
        node: NamedOrBlankNodeRef<'a>,
        predicate: NamedNodeRef<'a>,
    ) -> Option<LiteralRef<'a>>
    where
        'g: 'a,
    {
        let graph: &'a Graph = self.graph;
        match graph.object_for_subject_predicate(node, predicate) {
            Some(TermRef::Literal(literal)) => Some(literal),
            _ => None,
        }
    }

    fn integer(
        &self,
        id: &NamedOrBlankNode,
        predicate: NamedNodeRef<'static>,
    ) -> Result<Option<u64>, EngineError> {
        match self.literal(id.as_ref(), predicate) {
            Some(literal) => literal
                .value()
                .trim()
                .trim_start_matches('+')
                .parse::<u64>()
                .map(Some)
                .map_err(|_| {
                    invalid(
                        id,
                        format!("{predicate} expects a non-negative integer, got {literal}"),
                    )
                }),
            None => Ok(None),
        }
    }
}

fn compile_pattern(
    shape: &NamedOrBlankNode,
    pattern: &str,
    flags: &str,
) -> Result<Constraint, EngineError> {
    let inline: String = flags
        .chars()
        .filter(|flag| matches!(flag, 'i' | 'm' | 's' | 'x'))
        .collect();
    let source = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    let regex = Regex::new(&source).map_err(|source| EngineError::InvalidPattern {
        shape: shape.to_string(),
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(Constraint::Pattern {
        regex,
        pattern: pattern.to_string(),
    })
}

/// Rejects SHACL terms on `shape` that no constraint here evaluates.
fn check_parameters(graph: &Graph, shape: &NamedOrBlankNode) -> Result<(), EngineError> {
    for triple in graph.triples_for_subject(shape.as_ref()) {
        let predicate = triple.predicate;
        if predicate.as_str().starts_with(SH_NAMESPACE) && !SHAPE_PARAMETERS.contains(&predicate) {
            return Err(unsupported(shape, predicate));
        }
    }
    Ok(())
}

fn unsupported(shape: &NamedOrBlankNode, feature: NamedNodeRef<'_>) -> EngineError {
    EngineError::Unsupported {
        shape: shape.to_string(),
        feature: feature.to_string(),
    }
}

fn is_true(literal: LiteralRef<'_>) -> bool {
    matches!(literal.value().trim(), "true" | "1")
}

fn invalid(shape: &NamedOrBlankNode, message: impl Into<String>) -> EngineError {
    EngineError::InvalidShape {
        shape: shape.to_string(),
        message: message.into(),
    }
}

/// Triples reachable from a blank node through blank nodes only.
fn describe(graph: &Graph, term: TermRef<'_>) -> Vec<Triple> {
    let mut triples = Vec::new();
    let mut pending = match term {
        TermRef::BlankNode(node) => vec![node.into_owned()],
        _ => return triples,
    };
    let mut seen = IndexSet::new();
    while let Some(node) = pending.pop() {
        if !seen.insert(node.clone()) {
            continue;
        }
        for triple in graph.triples_for_subject(node.as_ref()) {
            if let TermRef::BlankNode(object) = triple.object {
                pending.push(object.into_owned());
            }
            triples.push(triple.into_owned());
        }
    }
    triples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{RdfSyntax, decode};

    fn shapes(turtle: &str) -> Vec<Shape> {
        let graph = decode(turtle.as_bytes(), RdfSyntax::Turtle, None, None).expect("decode");
        parse_shapes(graph.triples()).expect("parse shapes")
    }

    const PREFIXES: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
    "#;

    #[test]
    fn parses_targets_and_property_constraints() {
        let parsed = shapes(&format!(
            "{PREFIXES}
            ex:PersonShape a sh:NodeShape ;
                sh:targetClass ex:Person ;
                sh:property [
                    sh:path ex:name ;
                    sh:minCount 1 ;
                    sh:maxCount 2 ;
                    sh:datatype xsd:string ;
                    sh:pattern \"^[A-Z]\" ;
                    sh:flags \"i\" ;
                    sh:in ( \"Alice\" \"Bob\" ) ;
                ] ."
        ));
        assert_eq!(parsed.len(), 1);
        let shape = &parsed[0];
        assert!(matches!(shape.targets[0], Target::Class(_)));
        assert_eq!(shape.properties.len(), 1);

        let property = &shape.properties[0];
        assert!(matches!(
            property.path.as_ref().map(|spec| &spec.path),
            Some(PropertyPath::Predicate(_))
        ));
        let components: Vec<_> = property
            .constraints
            .iter()
            .map(|constraint| constraint.component())
            .collect();
        assert!(components.contains(&sh::MIN_COUNT_COMPONENT));
        assert!(components.contains(&sh::PATTERN_COMPONENT));
        let values = property.constraints.iter().find_map(|constraint| match constraint {
            Constraint::In(values) => Some(values.len()),
            _ => None,
        });
        assert_eq!(values, Some(2));
    }

    #[test]
    fn implicit_class_target() {
        let parsed = shapes(&format!(
            "{PREFIXES}
            ex:Person a rdfs:Class, sh:NodeShape ;
                sh:property [ sh:path ex:name ; sh:minCount 1 ] ."
        ));
        assert_eq!(parsed.len(), 1);
        assert!(matches!(&parsed[0].targets[..], [Target::Class(class)] if class.as_str() == "http://example.org/Person"));
    }

    #[test]
    fn complex_paths() {
        let parsed = shapes(&format!(
            "{PREFIXES}
            ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ( ex:knows [ sh:inversePath ex:parent ] ) ; sh:minCount 1 ] ;
                sh:property [ sh:path [ sh:zeroOrMorePath ex:next ] ; sh:maxCount 5 ] ."
        ));
        let paths: Vec<_> = parsed[0]
            .properties
            .iter()
            .filter_map(|property| property.path.as_ref())
            .collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().any(|spec| matches!(spec.path, PropertyPath::Sequence(ref steps) if steps.len() == 2)));
        assert!(paths.iter().all(|spec| !spec.description.is_empty()));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let graph = decode(
            format!("{PREFIXES} ex:S sh:targetNode ex:a ; sh:pattern \"([\" .").as_bytes(),
            RdfSyntax::Turtle,
            None,
            None,
        )
        .expect("decode");
        assert!(matches!(
            parse_shapes(graph.triples()),
            Err(EngineError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn inverting_a_sequence_reverses_it() {
        let a = PropertyPath::Predicate(NamedNode::new_unchecked("http://example.org/a"));
        let b = PropertyPath::Predicate(NamedNode::new_unchecked("http://example.org/b"));
        let inverted = PropertyPath::Sequence(vec![a.clone(), b.clone()]).inverted();
        assert_eq!(
            inverted,
            PropertyPath::Sequence(vec![
                PropertyPath::Inverse(Box::new(b)),
                PropertyPath::Inverse(Box::new(a)),
            ])
        );
    }

    #[test]
    fn unknown_shacl_parameters_are_rejected() {
        let graph = decode(
            format!("{PREFIXES} ex:S sh:targetNode ex:a ; sh:rule [ a sh:TripleRule ] .").as_bytes(),
            RdfSyntax::Turtle,
            None,
            None,
        )
        .expect("decode");
        assert!(matches!(
            parse_shapes(graph.triples()),
            Err(EngineError::Unsupported { ref feature, .. }) if feature.ends_with("#rule>")
        ));
    }

    #[test]
    fn recursive_shape_references_are_rejected() {
        let graph = decode(
            format!(
                "{PREFIXES} ex:Tree sh:targetNode ex:root ;
                    sh:property [ sh:path ex:child ; sh:node ex:Tree ] ."
            )
            .as_bytes(),
            RdfSyntax::Turtle,
            None,
            None,
        )
        .expect("decode");
        assert!(matches!(
            parse_shapes(graph.triples()),
            Err(EngineError::Unsupported { .. })
        ));
    }

    #[test]
    fn closed_shape_allows_direct_property_predicates() {
        let parsed = shapes(&format!(
            "{PREFIXES}
            ex:S sh:targetNode ex:a ; sh:closed true ;
                sh:ignoredProperties ( ex:seeAlso ) ;
                sh:property [ sh:path ex:name ] ;
                sh:property [ sh:path [ sh:inversePath ex:owns ] ] ."
        ));
        let allowed = parsed[0]
            .constraints
            .iter()
            .find_map(|constraint| match constraint {
                Constraint::Closed(allowed) => Some(allowed),
                _ => None,
            })
            .expect("closed constraint");
        let names: Vec<&str> = allowed.iter().map(NamedNode::as_str).collect();
        assert_eq!(
            names,
            vec!["http://example.org/name", "http://example.org/seeAlso"]
        );
    }
}
