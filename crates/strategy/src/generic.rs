//! Config-driven fallback strategy
//!
//! Carries no hardcoded vocabulary. Everything it knows comes from the
//! domain configuration handed in at call time: boost terms, field
//! enum values, alias tables. Used for any domain that has a config
//! but no matching custom or built-in strategy.

use intent_router_config::{DomainConfig, FieldConfig};
use intent_router_core::{ParameterSpec, TemplateMatch};
use serde_json::Value;

use crate::strategy::{
    default_field_priority, DomainStrategy, PatternMatcher, SemanticExtractor,
};

#[derive(Debug, Default)]
pub struct GenericStrategy;

impl GenericStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl DomainStrategy for GenericStrategy {
    fn name(&self) -> &str {
        "generic"
    }

    fn calculate_domain_boost(
        &self,
        _candidate: &TemplateMatch,
        query: &str,
        domain_config: Option<&DomainConfig>,
    ) -> f64 {
        domain_config
            .map(|config| config.boost_for_query(query))
            .unwrap_or(0.0)
    }

    fn pattern_matchers(&self) -> Vec<PatternMatcher> {
        Vec::new()
    }

    fn extract_domain_parameters(
        &self,
        query: &str,
        param: &ParameterSpec,
        domain_config: Option<&DomainConfig>,
    ) -> Option<Value> {
        let field = domain_config?.fields.get(&param.name)?;
        canonicalize_from_query(query, field).map(Value::String)
    }

    fn semantic_extractors(&self) -> Vec<SemanticExtractor> {
        Vec::new()
    }

    fn summary_field_priority(&self, field: &str, field_config: Option<&FieldConfig>) -> i32 {
        field_config
            .map(|c| c.priority)
            .unwrap_or_else(|| default_field_priority(field))
    }
}

/// Scan query tokens against a field's closed vocabulary and alias
/// table. Longest alias forms are checked as substrings so multi-word
/// surface forms still resolve.
fn canonicalize_from_query(query: &str, field: &FieldConfig) -> Option<String> {
    for token in query.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.is_empty() {
            continue;
        }
        if let Some(canonical) = field.canonicalize(token) {
            return Some(canonical);
        }
    }
    let query_lower = query.to_lowercase();
    for (canonical, forms) in &field.aliases {
        if forms
            .iter()
            .any(|f| f.contains(' ') && query_lower.contains(&f.to_lowercase()))
        {
            return Some(canonical.clone());
        }
    }
    None
}
