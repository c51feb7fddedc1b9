//! Pre-approved query templates
//!
//! A template is a parameterized, reviewed query pattern with
//! natural-language examples and semantic tags. Templates are immutable
//! once approved and carry a version; template sets are deserialized
//! from YAML documents at wiring time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Semantic classification of what a template does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticTags {
    /// Verb-like action, e.g. "find", "count", "list"
    #[serde(default)]
    pub action: String,
    /// The entity the template is primarily about, e.g. "customer"
    #[serde(default)]
    pub primary_entity: String,
    /// Additional qualifiers, e.g. "by_id", "recent"
    #[serde(default)]
    pub qualifiers: Vec<String>,
}

/// Declared type of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParameterType {
    /// Check that a JSON value matches this declared type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterType::String => value.is_string(),
            ParameterType::Integer => value.is_i64() || value.is_u64(),
            ParameterType::Number => value.is_number(),
            ParameterType::Boolean => value.is_boolean(),
        }
    }
}

/// One declared parameter on a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub required: bool,
    /// Used when extraction leaves a required parameter unresolved.
    #[serde(default)]
    pub default: Option<Value>,
    /// Closed value set; extraction matches case-insensitively.
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
    /// Regex the extracted raw text must satisfy.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// The backend query a template stands for. Opaque to the router; the
/// owning adapter knows how to run it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Engine tag, e.g. "sql", "mongo", "file"
    pub engine: String,
    /// Parameterized statement in the engine's own syntax
    pub statement: String,
}

fn default_version() -> u32 {
    1
}

fn default_result_format() -> String {
    "rows".to_string()
}

/// A pre-approved, parameterized query template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub description: String,
    #[serde(default)]
    pub nl_examples: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub semantic_tags: SemanticTags,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    pub query: QueryDefinition,
    #[serde(default = "default_result_format")]
    pub result_format: String,
}

impl Template {
    /// The first natural-language example, used as the canonical
    /// comparison text for string similarity.
    pub fn best_example(&self) -> Option<&str> {
        self.nl_examples.first().map(String::as_str)
    }

    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Names of all required parameters.
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Text indexed for embedding: description plus examples.
    pub fn embedding_text(&self) -> String {
        let mut text = self.description.clone();
        for example in &self.nl_examples {
            text.push('\n');
            text.push_str(example);
        }
        text
    }
}

/// A set of templates for one backend, loadable from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSet {
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl TemplateSet {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::TemplateParse(e.to_string()))
    }

    pub fn from_yaml_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::TemplateParse(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&raw)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
