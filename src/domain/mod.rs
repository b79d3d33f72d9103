//! Validation domains
//!
//! A domain is a named validation profile living in its own directory under
//! the resource root. The directory holds a `domain.yaml` (or `.yml`/`.json`)
//! descriptor plus the shape files and Hydra documents it references:
//!
//! ```text
//! resources/
//!   any/
//!     domain.yaml
//!     shapes/
//!       person.ttl
//!       address.ttl
//!     hydra/
//!       api.jsonld
//! ```
//!
//! ```yaml
//! name: any
//! channels: [rest_api, form]
//! validation_types:
//!   person:
//!     label: Person profile
//!     shapes: shapes
//! default_report_syntax: text/turtle
//! ```

pub mod registry;

pub use registry::DomainRegistry;

use crate::rdf::RdfSyntax;
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REPORT_SYNTAX: &str = "application/rdf+xml";

/// Surfaces a domain can be published on. Only `rest_api` is served here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidatorChannel {
    RestApi,
    Form,
    Email,
    SoapApi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationTypeConfig {
    /// Human readable description shown by the info endpoint
    #[serde(default)]
    pub label: Option<String>,
    /// Shape file or directory, relative to the domain directory
    pub shapes: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Directory name under the resource root. Filled in by the loader.
    #[serde(skip)]
    pub folder: String,
    /// Name used in request paths; defaults to the folder name
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub defined: bool,
    #[serde(default = "default_channels")]
    pub channels: Vec<ValidatorChannel>,
    /// Validation types in declaration order; the first one is the default
    pub validation_types: IndexMap<String, ValidationTypeConfig>,
    /// Report syntaxes advertised for this domain
    #[serde(default)]
    pub report_syntaxes: Vec<String>,
    #[serde(default = "default_report_syntax")]
    pub default_report_syntax: String,
    /// Whether owl:imports are followed when a request does not say
    #[serde(default)]
    pub load_imports: bool,
}

impl DomainConfig {
    pub fn is_rest_enabled(&self) -> bool {
        self.defined && self.channels.contains(&ValidatorChannel::RestApi)
    }

    /// The type used when a request names none.
    pub fn default_validation_type(&self) -> Option<&str> {
        self.validation_types.keys().next().map(String::as_str)
    }

    pub fn has_validation_type(&self, validation_type: &str) -> bool {
        self.validation_types.contains_key(validation_type)
    }

    /// Shape location fragment configured for `validation_type`.
    pub fn shape_mapping(&self, validation_type: &str) -> Option<&Path> {
        self.validation_types
            .get(validation_type)
            .map(|config| config.shapes.as_path())
    }

    pub fn directory(&self, resource_root: &Path) -> PathBuf {
        resource_root.join(&self.folder)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.name.is_empty(), "domain name must not be empty");
        anyhow::ensure!(
            !self.validation_types.is_empty(),
            "domain '{}' declares no validation types",
            self.name
        );
        anyhow::ensure!(
            RdfSyntax::from_media_type(&self.default_report_syntax).is_some(),
            "domain '{}' has unsupported default report syntax {:?}",
            self.name,
            self.default_report_syntax
        );
        for syntax in &self.report_syntaxes {
            anyhow::ensure!(
                RdfSyntax::from_media_type(syntax).is_some(),
                "domain '{}' lists unsupported report syntax {:?}",
                self.name,
                syntax
            );
        }
        for (validation_type, config) in &self.validation_types {
            anyhow::ensure!(
                !config.shapes.is_absolute()
                    && !config
                        .shapes
                        .components()
                        .any(|part| matches!(part, std::path::Component::ParentDir)),
                "domain '{}' type '{}' must reference shapes inside the domain directory",
                self.name,
                validation_type
            );
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_channels() -> Vec<ValidatorChannel> {
    vec![ValidatorChannel::RestApi]
}

fn default_report_syntax() -> String {
    DEFAULT_REPORT_SYNTAX.to_string()
}
