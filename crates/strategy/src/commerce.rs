//! Built-in commerce strategy
//!
//! Heuristics for order/customer/product domains: numeric id capture,
//! order-status vocabulary, quantity phrases. Registered under
//! "commerce" with aliases for the common backend names.

use intent_router_config::DomainConfig;
use intent_router_core::{ParameterSpec, ParameterType, TemplateMatch};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::strategy::{DomainStrategy, PatternMatcher, SemanticExtractor};

static ORDER_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\border\s*#?\s*(\d+)\b").expect("order ref regex"));
static ENTITY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:customer|order|product|invoice|item)\s*#?\s*(\d+)\b")
        .expect("entity id regex")
});
static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)\b").expect("bare number regex"));
static STATUS_TERM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(pending|processing|shipped|delivered|cancelled|returned|refunded)\b")
        .expect("status regex")
});
static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(?:items?|units?|pieces?|orders?)\b").expect("quantity regex")
});

const COMMERCE_ENTITIES: &[&str] = &[
    "customer", "order", "product", "invoice", "item", "sale", "purchase",
];

fn extract_order_reference(query: &str) -> Option<Value> {
    let caps = ORDER_REF.captures(query)?;
    let id: i64 = caps.get(1)?.as_str().parse().ok()?;
    Some(Value::from(id))
}

fn extract_status_mention(query: &str) -> Option<Value> {
    let caps = STATUS_TERM.captures(query)?;
    Some(Value::String(caps.get(1)?.as_str().to_lowercase()))
}

#[derive(Debug, Default)]
pub struct CommerceStrategy;

impl CommerceStrategy {
    pub fn new() -> Self {
        Self
    }

    fn extract_numeric_id(&self, query: &str) -> Option<i64> {
        if let Some(caps) = ENTITY_ID.captures(query) {
            return caps.get(1)?.as_str().parse().ok();
        }
        // A lone number in a short query is almost always the id.
        let numbers: Vec<_> = BARE_NUMBER.captures_iter(query).collect();
        if numbers.len() == 1 {
            return numbers[0].get(1)?.as_str().parse().ok();
        }
        None
    }
}

impl DomainStrategy for CommerceStrategy {
    fn name(&self) -> &str {
        "commerce"
    }

    fn aliases(&self) -> &[&str] {
        &["orders", "retail", "sales", "inventory"]
    }

    fn calculate_domain_boost(
        &self,
        candidate: &TemplateMatch,
        query: &str,
        domain_config: Option<&DomainConfig>,
    ) -> f64 {
        let mut boost = 0.0;
        let entity = candidate.template.semantic_tags.primary_entity.to_lowercase();
        let entity_matches = COMMERCE_ENTITIES.contains(&entity.as_str());

        if entity_matches && ENTITY_ID.is_match(query) {
            boost += 0.05;
        }
        if entity_matches && STATUS_TERM.is_match(query) {
            boost += 0.03;
        }
        if let Some(config) = domain_config {
            boost += config.boost_for_query(query);
        }
        boost
    }

    fn pattern_matchers(&self) -> Vec<PatternMatcher> {
        vec![
            PatternMatcher::new("order_reference", &ORDER_REF),
            PatternMatcher::new("entity_id", &ENTITY_ID),
            PatternMatcher::new("status_term", &STATUS_TERM),
            PatternMatcher::new("quantity_phrase", &QUANTITY),
        ]
    }

    fn extract_domain_parameters(
        &self,
        query: &str,
        param: &ParameterSpec,
        domain_config: Option<&DomainConfig>,
    ) -> Option<Value> {
        let name = param.name.to_lowercase();

        if name == "id" || name.ends_with("_id") {
            return self.extract_numeric_id(query).map(Value::from);
        }

        if name.contains("status") {
            // Domain vocabulary wins over the built-in status list.
            if let Some(field) = domain_config.and_then(|c| c.fields.get(&param.name)) {
                for token in query.split_whitespace() {
                    if let Some(canonical) = field.canonicalize(token) {
                        return Some(Value::String(canonical));
                    }
                }
            }
            return extract_status_mention(query);
        }

        if matches!(param.param_type, ParameterType::Integer)
            && (name.contains("quantity") || name.contains("count") || name.contains("limit"))
        {
            let caps = QUANTITY.captures(query)?;
            let n: i64 = caps.get(1)?.as_str().parse().ok()?;
            return Some(Value::from(n));
        }

        None
    }

    fn semantic_extractors(&self) -> Vec<SemanticExtractor> {
        vec![
            SemanticExtractor {
                name: "order_reference",
                extract: extract_order_reference,
            },
            SemanticExtractor {
                name: "status_mention",
                extract: extract_status_mention,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_router_core::TemplateSet;
    use std::sync::Arc;

    fn id_param() -> ParameterSpec {
        ParameterSpec {
            name: "customer_id".to_string(),
            param_type: ParameterType::Integer,
            required: true,
            default: None,
            allowed_values: None,
            pattern: None,
            description: String::new(),
        }
    }

    fn customer_match() -> TemplateMatch {
        let set = TemplateSet::from_yaml(
            r#"
templates:
  - id: find_customer_by_id
    description: "Find a customer record by numeric id"
    semantic_tags:
      action: find
      primary_entity: customer
    query:
      engine: sql
      statement: "SELECT * FROM customers WHERE id = :customer_id"
"#,
        )
        .unwrap();
        TemplateMatch::new(Arc::new(set.templates[0].clone()), "orders", 0.92)
    }

    #[test]
    fn extracts_customer_id_from_entity_phrase() {
        let strategy = CommerceStrategy::new();
        let value = strategy.extract_domain_parameters("Show me customer 123", &id_param(), None);
        assert_eq!(value, Some(Value::from(123)));
    }

    #[test]
    fn extracts_lone_number_as_id() {
        let strategy = CommerceStrategy::new();
        let value = strategy.extract_domain_parameters("look up 456 for me", &id_param(), None);
        assert_eq!(value, Some(Value::from(456)));
    }

    #[test]
    fn ambiguous_numbers_decline() {
        let strategy = CommerceStrategy::new();
        let value =
            strategy.extract_domain_parameters("compare 12 against 34", &id_param(), None);
        assert_eq!(value, None);
    }

    #[test]
    fn status_extraction_normalizes_case() {
        let strategy = CommerceStrategy::new();
        let param = ParameterSpec {
            name: "status".to_string(),
            param_type: ParameterType::String,
            required: false,
            default: None,
            allowed_values: None,
            pattern: None,
            description: String::new(),
        };
        let value = strategy.extract_domain_parameters("orders that were Shipped", &param, None);
        assert_eq!(value, Some(Value::String("shipped".to_string())));
    }

    #[test]
    fn boost_fires_on_entity_and_id() {
        let strategy = CommerceStrategy::new();
        let candidate = customer_match();
        let boost = strategy.calculate_domain_boost(&candidate, "Show me customer 123", None);
        assert!(boost > 0.0);

        let no_boost = strategy.calculate_domain_boost(&candidate, "what is the weather", None);
        assert_eq!(no_boost, 0.0);
    }

    #[test]
    fn pattern_matchers_are_named() {
        let strategy = CommerceStrategy::new();
        let matchers = strategy.pattern_matchers();
        let order_ref = matchers
            .iter()
            .find(|m| m.name == "order_reference")
            .unwrap();
        assert!(order_ref.matches("cancel order #98"));
        assert_eq!(order_ref.capture("cancel order #98"), Some("98".to_string()));
    }
}
