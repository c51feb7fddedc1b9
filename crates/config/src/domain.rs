//! Per-backend domain configuration (YAML-driven)
//!
//! Each backend adapter may carry one domain file under the configured
//! domain directory. A domain file names the entities and fields the
//! backend's templates speak about, plus optional boost terms that
//! nudge scoring toward that backend when the query uses its
//! vocabulary. Nothing here is hardcoded per domain; the router only
//! ever sees these declarations.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One entity the domain's templates reference (for example
/// "customer" or "store").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EntityConfig {
    /// Alternate surface forms a query may use for this entity.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// One extractable field within the domain.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FieldConfig {
    /// Closed vocabulary for the field, when it has one.
    #[serde(default)]
    pub enum_values: Vec<String>,
    /// Canonical value -> surface forms that map to it.
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
    /// Extraction priority when multiple fields could claim the same
    /// query token. Higher wins.
    #[serde(default)]
    pub priority: i32,
}

impl FieldConfig {
    /// Resolve a query token to a canonical enum value, checking the
    /// closed vocabulary first and then the alias table.
    pub fn canonicalize(&self, token: &str) -> Option<String> {
        let lower = token.to_lowercase();
        if let Some(value) = self
            .enum_values
            .iter()
            .find(|v| v.to_lowercase() == lower)
        {
            return Some(value.clone());
        }
        for (canonical, forms) in &self.aliases {
            if forms.iter().any(|f| f.to_lowercase() == lower) {
                return Some(canonical.clone());
            }
        }
        None
    }
}

/// A vocabulary term that boosts this domain's candidates when it
/// appears in the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostTerm {
    pub term: String,
    #[serde(default = "default_term_boost")]
    pub boost: f64,
    /// Related surface forms that carry a reduced boost.
    #[serde(default)]
    pub related: Vec<String>,
}

fn default_term_boost() -> f64 {
    0.05
}

/// Domain-level boost settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBoostConfig {
    #[serde(default)]
    pub terms: Vec<BoostTerm>,
    /// Ceiling on the accumulated boost for one candidate.
    #[serde(default = "default_max_boost")]
    pub max_boost: f64,
}

impl Default for DomainBoostConfig {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            max_boost: default_max_boost(),
        }
    }
}

fn default_max_boost() -> f64 {
    0.1
}

/// Complete configuration for one backend's domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Must match the adapter name the backend registers under.
    pub domain_name: String,
    /// Strategy key resolved by the strategy registry. Unknown keys
    /// fall back to the generic strategy.
    #[serde(default = "default_domain_type")]
    pub domain_type: String,
    #[serde(default)]
    pub entities: HashMap<String, EntityConfig>,
    #[serde(default)]
    pub fields: HashMap<String, FieldConfig>,
    #[serde(default)]
    pub boost: DomainBoostConfig,
}

fn default_domain_type() -> String {
    "generic".to_string()
}

impl DomainConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::ParseError(format!("domain config: {e}")))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Fields sorted by descending extraction priority.
    pub fn fields_by_priority(&self) -> Vec<(&String, &FieldConfig)> {
        let mut fields: Vec<_> = self.fields.iter().collect();
        fields.sort_by(|a, b| b.1.priority.cmp(&a.1.priority).then(a.0.cmp(b.0)));
        fields
    }

    /// Accumulated boost for a query against this domain's terms,
    /// capped at `max_boost`. Returns 0.0 when nothing matches.
    pub fn boost_for_query(&self, query: &str) -> f64 {
        let query_lower = query.to_lowercase();
        let mut total = 0.0;
        for entry in &self.boost.terms {
            if query_lower.contains(&entry.term.to_lowercase()) {
                total += entry.boost;
            } else if entry
                .related
                .iter()
                .any(|r| query_lower.contains(&r.to_lowercase()))
            {
                total += entry.boost * 0.8;
            }
        }
        total.min(self.boost.max_boost)
    }
}

/// Load every `*.yaml`/`*.yml` file under `dir` as a domain config,
/// keyed by domain name. A missing directory is an error; an empty
/// one is not.
pub fn load_domain_configs(dir: &Path) -> Result<HashMap<String, DomainConfig>, ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::FileNotFound(dir.display().to_string()));
    }

    let mut configs = HashMap::new();
    let entries =
        fs::read_dir(dir).map_err(|_| ConfigError::FileNotFound(dir.display().to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if !is_yaml {
            continue;
        }
        let config = DomainConfig::from_yaml_file(&path)?;
        tracing::debug!(
            domain = %config.domain_name,
            domain_type = %config.domain_type,
            fields = config.fields.len(),
            "loaded domain config"
        );
        if let Some(previous) = configs.insert(config.domain_name.clone(), config) {
            return Err(ConfigError::InvalidValue {
                field: "domain_name".to_string(),
                message: format!("duplicate domain config for '{}'", previous.domain_name),
            });
        }
    }
    Ok(configs)
}
