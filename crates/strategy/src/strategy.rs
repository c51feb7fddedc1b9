//! The domain strategy capability set
//!
//! A strategy bundles the per-domain heuristics the router consults
//! during scoring and parameter extraction:
//! - named pattern matchers over the raw query
//! - a signed score boost for a candidate (may penalize)
//! - parameter extraction keyed by parameter-name heuristics
//! - semantic extractors for whole-query signals
//! - summary field priority ranking
//!
//! Implementing the trait is the capability check; a type that
//! compiles against it carries the full set.

use intent_router_config::{DomainConfig, FieldConfig};
use intent_router_core::{ParameterSpec, TemplateMatch};
use regex::Regex;
use serde_json::Value;

/// A named predicate over the raw query text.
#[derive(Clone)]
pub struct PatternMatcher {
    pub name: &'static str,
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(name: &'static str, regex: &Regex) -> Self {
        Self {
            name,
            regex: regex.clone(),
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        self.regex.is_match(query)
    }

    /// First capture group if the pattern has one, else the full
    /// match.
    pub fn capture(&self, query: &str) -> Option<String> {
        let caps = self.regex.captures(query)?;
        let m = caps.get(1).or_else(|| caps.get(0))?;
        Some(m.as_str().to_string())
    }
}

impl std::fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("name", &self.name)
            .finish()
    }
}

/// A named whole-query extractor producing a semantic signal.
#[derive(Clone, Copy)]
pub struct SemanticExtractor {
    pub name: &'static str,
    pub extract: fn(&str) -> Option<Value>,
}

impl std::fmt::Debug for SemanticExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticExtractor")
            .field("name", &self.name)
            .finish()
    }
}

/// Per-domain heuristics consulted by scoring and extraction.
pub trait DomainStrategy: Send + Sync {
    /// Primary name the strategy registers under.
    fn name(&self) -> &str;

    /// Alternate domain names that resolve to this strategy.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Signed score delta for one candidate. Negative deltas are
    /// legal: a strategy may penalize an interpretation when a
    /// competing pattern also fires on the same query.
    fn calculate_domain_boost(
        &self,
        candidate: &TemplateMatch,
        query: &str,
        domain_config: Option<&DomainConfig>,
    ) -> f64;

    fn pattern_matchers(&self) -> Vec<PatternMatcher>;

    /// Extract one declared parameter from the query, or decline.
    fn extract_domain_parameters(
        &self,
        query: &str,
        param: &ParameterSpec,
        domain_config: Option<&DomainConfig>,
    ) -> Option<Value>;

    fn semantic_extractors(&self) -> Vec<SemanticExtractor>;

    /// Rank for a field when summarizing rows. Higher surfaces first.
    fn summary_field_priority(&self, field: &str, field_config: Option<&FieldConfig>) -> i32 {
        if let Some(config) = field_config {
            return config.priority;
        }
        default_field_priority(field)
    }
}

/// Name-based fallback ranking shared by strategies that have no
/// per-field configuration.
pub fn default_field_priority(field: &str) -> i32 {
    let lower = field.to_lowercase();
    if lower == "id" || lower.ends_with("_id") {
        100
    } else if lower == "name" || lower.ends_with("_name") {
        90
    } else if lower.contains("status") || lower.contains("state") {
        80
    } else if lower.contains("date") || lower.contains("time") {
        60
    } else if lower.contains("description") || lower.contains("notes") {
        10
    } else {
        50
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").unwrap());

    #[test]
    fn matcher_captures_first_group() {
        let matcher = PatternMatcher::new("digits", &DIGITS);
        assert!(matcher.matches("order 42 please"));
        assert_eq!(matcher.capture("order 42 please"), Some("42".to_string()));
        assert_eq!(matcher.capture("no numbers here"), None);
    }

    #[test]
    fn field_priority_ranks_ids_first() {
        assert!(default_field_priority("customer_id") > default_field_priority("name"));
        assert!(default_field_priority("name") > default_field_priority("status"));
        assert!(default_field_priority("status") > default_field_priority("description"));
    }
}
