//! SHACL terms used by the engine and its reports.

use oxigraph::model::NamedNodeRef;

macro_rules! sh_terms {
    ($($name:ident = $local:literal;)*) => {
        $(
            pub const $name: NamedNodeRef<'static> =
                NamedNodeRef::new_unchecked(concat!("http://www.w3.org/ns/shacl#", $local));
        )*
    };
}

sh_terms! {
    // shapes
    NODE_SHAPE = "NodeShape";
    PROPERTY_SHAPE = "PropertyShape";
    PROPERTY = "property";
    PATH = "path";
    INVERSE_PATH = "inversePath";
    ALTERNATIVE_PATH = "alternativePath";
    ZERO_OR_MORE_PATH = "zeroOrMorePath";
    ONE_OR_MORE_PATH = "oneOrMorePath";
    ZERO_OR_ONE_PATH = "zeroOrOnePath";
    DEACTIVATED = "deactivated";
    SEVERITY = "severity";
    MESSAGE = "message";

    // non-validating shape characteristics
    NAME = "name";
    DESCRIPTION = "description";
    ORDER = "order";
    GROUP = "group";
    DEFAULT_VALUE = "defaultValue";

    // targets
    TARGET_NODE = "targetNode";
    TARGET_CLASS = "targetClass";
    TARGET_SUBJECTS_OF = "targetSubjectsOf";
    TARGET_OBJECTS_OF = "targetObjectsOf";

    // constraint parameters
    MIN_COUNT = "minCount";
    MAX_COUNT = "maxCount";
    DATATYPE = "datatype";
    CLASS = "class";
    NODE_KIND = "nodeKind";
    PATTERN = "pattern";
    FLAGS = "flags";
    MIN_LENGTH = "minLength";
    MAX_LENGTH = "maxLength";
    MIN_INCLUSIVE = "minInclusive";
    MAX_INCLUSIVE = "maxInclusive";
    MIN_EXCLUSIVE = "minExclusive";
    MAX_EXCLUSIVE = "maxExclusive";
    IN = "in";
    HAS_VALUE = "hasValue";
    UNIQUE_LANG = "uniqueLang";
    LANGUAGE_IN = "languageIn";
    EQUALS = "equals";
    DISJOINT = "disjoint";
    LESS_THAN = "lessThan";
    LESS_THAN_OR_EQUALS = "lessThanOrEquals";
    NODE = "node";
    AND = "and";
    OR = "or";
    NOT = "not";
    XONE = "xone";
    CLOSED = "closed";
    IGNORED_PROPERTIES = "ignoredProperties";
    QUALIFIED_VALUE_SHAPE = "qualifiedValueShape";
    QUALIFIED_MIN_COUNT = "qualifiedMinCount";
    QUALIFIED_MAX_COUNT = "qualifiedMaxCount";
    QUALIFIED_VALUE_SHAPES_DISJOINT = "qualifiedValueShapesDisjoint";
    SPARQL = "sparql";

    // node kinds
    IRI = "IRI";
    BLANK_NODE = "BlankNode";
    LITERAL = "Literal";
    BLANK_NODE_OR_IRI = "BlankNodeOrIRI";
    BLANK_NODE_OR_LITERAL = "BlankNodeOrLiteral";
    IRI_OR_LITERAL = "IRIOrLiteral";

    // severities
    VIOLATION = "Violation";
    WARNING = "Warning";
    INFO = "Info";

    // constraint components
    MIN_COUNT_COMPONENT = "MinCountConstraintComponent";
    MAX_COUNT_COMPONENT = "MaxCountConstraintComponent";
    DATATYPE_COMPONENT = "DatatypeConstraintComponent";
    CLASS_COMPONENT = "ClassConstraintComponent";
    NODE_KIND_COMPONENT = "NodeKindConstraintComponent";
    PATTERN_COMPONENT = "PatternConstraintComponent";
    MIN_LENGTH_COMPONENT = "MinLengthConstraintComponent";
    MAX_LENGTH_COMPONENT = "MaxLengthConstraintComponent";
    MIN_INCLUSIVE_COMPONENT = "MinInclusiveConstraintComponent";
    MAX_INCLUSIVE_COMPONENT = "MaxInclusiveConstraintComponent";
    MIN_EXCLUSIVE_COMPONENT = "MinExclusiveConstraintComponent";
    MAX_EXCLUSIVE_COMPONENT = "MaxExclusiveConstraintComponent";
    IN_COMPONENT = "InConstraintComponent";
    HAS_VALUE_COMPONENT = "HasValueConstraintComponent";
    UNIQUE_LANG_COMPONENT = "UniqueLangConstraintComponent";
    LANGUAGE_IN_COMPONENT = "LanguageInConstraintComponent";
    EQUALS_COMPONENT = "EqualsConstraintComponent";
    DISJOINT_COMPONENT = "DisjointConstraintComponent";
    LESS_THAN_COMPONENT = "LessThanConstraintComponent";
    LESS_THAN_OR_EQUALS_COMPONENT = "LessThanOrEqualsConstraintComponent";
    NODE_COMPONENT = "NodeConstraintComponent";
    AND_COMPONENT = "AndConstraintComponent";
    OR_COMPONENT = "OrConstraintComponent";
    NOT_COMPONENT = "NotConstraintComponent";
    XONE_COMPONENT = "XoneConstraintComponent";
    CLOSED_COMPONENT = "ClosedConstraintComponent";
    QUALIFIED_MIN_COUNT_COMPONENT = "QualifiedMinCountConstraintComponent";
    QUALIFIED_MAX_COUNT_COMPONENT = "QualifiedMaxCountConstraintComponent";

    // report vocabulary
    VALIDATION_REPORT = "ValidationReport";
    VALIDATION_RESULT = "ValidationResult";
    CONFORMS = "conforms";
    RESULT = "result";
    FOCUS_NODE = "focusNode";
    RESULT_PATH = "resultPath";
    VALUE = "value";
    RESULT_SEVERITY = "resultSeverity";
    SOURCE_SHAPE = "sourceShape";
    SOURCE_CONSTRAINT_COMPONENT = "sourceConstraintComponent";
    RESULT_MESSAGE = "resultMessage";
}

pub const OWL_CLASS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Class");
