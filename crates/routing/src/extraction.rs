//! Parameter extraction chain
//!
//! Each declared parameter is resolved through a fixed chain:
//! domain-strategy extractor, generic typed extraction, one LLM call
//! for everything still missing, template default. A required
//! parameter that survives the whole chain unresolved fails the query
//! with a structured missing-parameters error; it is never silently
//! defaulted to an invented value.

use std::collections::HashMap;
use std::sync::Arc;

use intent_router_config::DomainConfig;
use intent_router_core::{Error, ExtractionModel, ParameterSpec, ParameterType, Result, Template};
use intent_router_strategy::DomainStrategy;
use regex::Regex;
use serde_json::Value;

pub struct ParameterExtractor {
    strategy: Option<Arc<dyn DomainStrategy>>,
    domain_config: Option<DomainConfig>,
    llm: Option<Arc<dyn ExtractionModel>>,
}

impl Default for ParameterExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterExtractor {
    pub fn new() -> Self {
        Self {
            strategy: None,
            domain_config: None,
            llm: None,
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn DomainStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_domain_config(mut self, config: DomainConfig) -> Self {
        self.domain_config = Some(config);
        self
    }

    pub fn with_extraction_model(mut self, llm: Arc<dyn ExtractionModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Resolve every declared parameter of `template` from `query`.
    pub async fn extract(
        &self,
        query: &str,
        template: &Template,
    ) -> Result<HashMap<String, Value>> {
        let mut resolved: HashMap<String, Value> = HashMap::new();

        for param in &template.parameters {
            if let Some(value) = self.extract_one(query, param) {
                resolved.insert(param.name.clone(), value);
            }
        }

        let missing: Vec<&ParameterSpec> = template
            .parameters
            .iter()
            .filter(|p| !resolved.contains_key(&p.name))
            .collect();

        if !missing.is_empty() {
            if let Some(llm) = &self.llm {
                let llm_values = self.llm_extract(llm.as_ref(), query, template).await;
                for param in &missing {
                    let Some(raw) = llm_values.get(&param.name) else {
                        continue;
                    };
                    match validate_value(param, raw.clone()) {
                        Some(value) => {
                            resolved.insert(param.name.clone(), value);
                        }
                        None => {
                            tracing::debug!(
                                template_id = %template.id,
                                parameter = %param.name,
                                "llm value rejected by parameter constraints"
                            );
                        }
                    }
                }
            }
        }

        let mut unresolved_required = Vec::new();
        for param in &template.parameters {
            if resolved.contains_key(&param.name) {
                continue;
            }
            if let Some(default) = &param.default {
                resolved.insert(param.name.clone(), default.clone());
                continue;
            }
            if param.required {
                unresolved_required.push(param.name.clone());
            }
        }

        if !unresolved_required.is_empty() {
            return Err(Error::MissingParameters {
                template_id: template.id.clone(),
                parameters: unresolved_required,
            });
        }

        Ok(resolved)
    }

    /// Strategy extractor first, then generic typed extraction.
    fn extract_one(&self, query: &str, param: &ParameterSpec) -> Option<Value> {
        if let Some(strategy) = &self.strategy {
            let candidate =
                strategy.extract_domain_parameters(query, param, self.domain_config.as_ref());
            if let Some(value) = candidate.and_then(|v| validate_value(param, v)) {
                return Some(value);
            }
        }
        generic_extract(query, param).and_then(|v| validate_value(param, v))
    }

    /// One call covering every still-missing parameter. Any failure
    /// here leaves those parameters absent rather than failing the
    /// query.
    async fn llm_extract(
        &self,
        llm: &dyn ExtractionModel,
        query: &str,
        template: &Template,
    ) -> HashMap<String, Value> {
        let raw = match llm.extract(query, template).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    template_id = %template.id,
                    stage = "extraction",
                    error = %e,
                    "llm extraction call failed; unresolved parameters stay absent"
                );
                return HashMap::new();
            }
        };
        match parse_json_object(&raw) {
            Some(map) => map,
            None => {
                tracing::warn!(
                    template_id = %template.id,
                    stage = "extraction",
                    "llm output contained no parseable JSON object"
                );
                HashMap::new()
            }
        }
    }
}

/// Find a JSON object substring in free-form model output and parse
/// it as a name -> value map.
fn parse_json_object(raw: &str) -> Option<HashMap<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Typed extraction from the raw query, driven only by the declared
/// parameter shape.
fn generic_extract(query: &str, param: &ParameterSpec) -> Option<Value> {
    if let Some(allowed) = &param.allowed_values {
        let lower = query.to_lowercase();
        return allowed
            .iter()
            .find(|v| contains_word(&lower, &v.to_lowercase()))
            .map(|v| Value::String(v.clone()));
    }

    match param.param_type {
        ParameterType::Integer => {
            let numbers: Vec<i64> = numeric_tokens(query)
                .filter_map(|t| t.parse::<i64>().ok())
                .collect();
            match numbers.as_slice() {
                [only] => Some(Value::from(*only)),
                // More than one number is ambiguous without domain
                // knowledge; decline and let the LLM decide.
                _ => None,
            }
        }
        ParameterType::Number => {
            let numbers: Vec<f64> = numeric_tokens(query)
                .filter_map(|t| t.parse::<f64>().ok())
                .collect();
            match numbers.as_slice() {
                [only] => serde_json::Number::from_f64(*only).map(Value::Number),
                _ => None,
            }
        }
        ParameterType::Boolean => {
            let lower = query.to_lowercase();
            if contains_word(&lower, "true") || contains_word(&lower, "yes") {
                Some(Value::Bool(true))
            } else if contains_word(&lower, "false") || contains_word(&lower, "no") {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        ParameterType::String => None,
    }
}

fn numeric_tokens(query: &str) -> impl Iterator<Item = &str> {
    query
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '.'))
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit() || c == '.'))
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.split_whitespace().any(|token| {
        token.trim_matches(|c: char| !c.is_alphanumeric()) == needle
    }) || (needle.contains(' ') && haystack.contains(needle))
}

/// Coerce a candidate to the declared type and check allowed values
/// and the declared pattern. `None` rejects the candidate.
pub(crate) fn validate_value(param: &ParameterSpec, value: Value) -> Option<Value> {
    let coerced = coerce_to_type(param.param_type, value)?;

    if let Some(allowed) = &param.allowed_values {
        let text = value_text(&coerced);
        let canonical = allowed
            .iter()
            .find(|v| v.eq_ignore_ascii_case(&text))?;
        return Some(Value::String(canonical.clone()));
    }

    if let Some(pattern) = &param.pattern {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(&value_text(&coerced)) {
                    return None;
                }
            }
            Err(e) => {
                tracing::warn!(
                    parameter = %param.name,
                    pattern = %pattern,
                    error = %e,
                    "invalid parameter pattern; skipping pattern check"
                );
            }
        }
    }

    Some(coerced)
}

fn coerce_to_type(param_type: ParameterType, value: Value) -> Option<Value> {
    if param_type.accepts(&value) {
        return Some(value);
    }
    match (param_type, &value) {
        (ParameterType::Integer, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(Value::from)
        }
        (ParameterType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number)),
        (ParameterType::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(Value::Bool(true)),
            "false" | "no" => Some(Value::Bool(false)),
            _ => None,
        },
        (ParameterType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{template_from_yaml, FailingExtractor, ScriptedExtractor};
    use intent_router_strategy::CommerceStrategy;

    fn customer_template() -> Arc<Template> {
        template_from_yaml(
            r#"
templates:
  - id: find_customer_by_id
    description: "Find a customer record by numeric id"
    parameters:
      - name: customer_id
        type: integer
        required: true
    query: { engine: sql, statement: "SELECT 1" }
"#,
        )
    }

    #[tokio::test]
    async fn strategy_extractor_resolves_entity_id() {
        let extractor = ParameterExtractor::new().with_strategy(Arc::new(CommerceStrategy));
        let params = extractor
            .extract("Show me customer 123", &customer_template())
            .await
            .unwrap();
        assert_eq!(params.get("customer_id"), Some(&Value::from(123)));
    }

    #[tokio::test]
    async fn generic_extraction_handles_lone_number_and_allowed_values() {
        let template = template_from_yaml(
            r#"
templates:
  - id: orders_by_status
    description: "List orders filtered by status"
    parameters:
      - name: status
        type: string
        required: true
        allowed_values: [pending, shipped, delivered]
      - name: limit
        type: integer
        required: false
    query: { engine: sql, statement: "SELECT 1" }
"#,
        );
        let extractor = ParameterExtractor::new();
        let params = extractor
            .extract("show 5 shipped orders", &template)
            .await
            .unwrap();
        assert_eq!(params.get("status"), Some(&Value::String("shipped".into())));
        assert_eq!(params.get("limit"), Some(&Value::from(5)));
    }

    #[tokio::test]
    async fn ambiguous_numbers_fall_through_to_llm() {
        let extractor = ParameterExtractor::new()
            .with_extraction_model(Arc::new(ScriptedExtractor::new(
                r#"Sure, here you go: {"customer_id": 42}"#,
            )));
        let params = extractor
            .extract("compare customer records 42 and 99", &customer_template())
            .await
            .unwrap();
        assert_eq!(params.get("customer_id"), Some(&Value::from(42)));
    }

    #[tokio::test]
    async fn llm_string_value_is_coerced_to_declared_type() {
        let extractor = ParameterExtractor::new()
            .with_extraction_model(Arc::new(ScriptedExtractor::new(
                r#"{"customer_id": "314"}"#,
            )));
        let params = extractor
            .extract("that customer we talked about and another one 1 2", &customer_template())
            .await
            .unwrap();
        assert_eq!(params.get("customer_id"), Some(&Value::from(314)));
    }

    #[tokio::test]
    async fn unparseable_llm_output_is_not_fatal() {
        let template = template_from_yaml(
            r#"
templates:
  - id: recent_orders
    description: "List recent orders"
    parameters:
      - name: limit
        type: integer
        required: false
        default: 10
    query: { engine: sql, statement: "SELECT 1" }
"#,
        );
        let extractor = ParameterExtractor::new()
            .with_extraction_model(Arc::new(ScriptedExtractor::new("no json here")));
        let params = extractor.extract("recent orders", &template).await.unwrap();
        assert_eq!(params.get("limit"), Some(&Value::from(10)));
    }

    #[tokio::test]
    async fn missing_required_parameter_is_a_structured_error() {
        let extractor = ParameterExtractor::new()
            .with_extraction_model(Arc::new(FailingExtractor));
        let err = extractor
            .extract("find that customer", &customer_template())
            .await
            .unwrap_err();
        match err {
            Error::MissingParameters {
                template_id,
                parameters,
            } => {
                assert_eq!(template_id, "find_customer_by_id");
                assert_eq!(parameters, vec!["customer_id".to_string()]);
            }
            other => panic!("expected MissingParameters, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pattern_rejects_nonconforming_values() {
        let template = template_from_yaml(
            r#"
templates:
  - id: lookup_sku
    description: "Look up a product by SKU"
    parameters:
      - name: sku
        type: string
        required: true
        pattern: "^SKU-\\d{4}$"
    query: { engine: sql, statement: "SELECT 1" }
"#,
        );
        let good = ParameterExtractor::new()
            .with_extraction_model(Arc::new(ScriptedExtractor::new(r#"{"sku": "SKU-1234"}"#)));
        let params = good.extract("look up SKU-1234", &template).await.unwrap();
        assert_eq!(params.get("sku"), Some(&Value::String("SKU-1234".into())));

        let bad = ParameterExtractor::new()
            .with_extraction_model(Arc::new(ScriptedExtractor::new(r#"{"sku": "1234"}"#)));
        assert!(matches!(
            bad.extract("look up 1234", &template).await,
            Err(Error::MissingParameters { .. })
        ));
    }

    #[test]
    fn json_object_is_located_inside_prose() {
        let map = parse_json_object("the parameters are {\"a\": 1} as requested").unwrap();
        assert_eq!(map.get("a"), Some(&Value::from(1)));
        assert!(parse_json_object("} not json {").is_none());
        assert!(parse_json_object("plain text").is_none());
    }
}
