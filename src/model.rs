use serde::{Deserialize, Serialize};

/// Body of a single validation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    /// Inline RDF, a URL pointing at it, or its Base64 encoding
    #[serde(default)]
    pub content_to_validate: String,
    /// Media type of the content; required unless a URL extension tells
    pub content_syntax: Option<String>,
    /// `STRING`, `URL` or `BASE64`; inferred from the content when absent
    pub embedding_method: Option<String>,
    /// Defaults to the first type the domain declares
    pub validation_type: Option<String>,
    pub report_syntax: Option<String>,
    /// Client supplied shapes. Not supported, must be absent or empty.
    pub external_rules: Option<Vec<RuleSet>>,
    /// Follow owl:imports of the content; falls back to the domain default
    pub load_imports: Option<bool>,
}

impl Input {
    pub fn has_external_rules(&self) -> bool {
        self.external_rules
            .as_ref()
            .is_some_and(|rules| !rules.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub rule_set: String,
    pub embedding_method: Option<String>,
    pub rule_syntax: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    pub domain: String,
    pub validation_types: Vec<ValidationTypeInfo>,
    pub report_syntaxes: Vec<String>,
    pub default_report_syntax: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationTypeInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}
