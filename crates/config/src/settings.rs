//! Router settings: file + environment layering with validation
//!
//! Settings are loaded from `config/default.yaml`, an optional
//! per-environment file, and `INTENT_ROUTER_`-prefixed environment
//! variables (double-underscore separated for nesting). Validation is
//! fail-fast for out-of-range values; suspicious-but-legal weight
//! combinations produce warnings only.

use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Strict validation applies outside development.
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

/// String-similarity algorithm used by the optional third scoring
/// stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityAlgorithm {
    #[default]
    JaroWinkler,
    Levenshtein,
}

/// Template fields the string-similarity stage compares the query
/// against. The best score across the configured fields wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareField {
    Description,
    BestExample,
}

/// Deterministic tie-breaker applied when selection scores are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    #[default]
    SourceAdapterAlphabetical,
    TemplateIdAlphabetical,
}

/// Second-stage LLM reranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Provider label resolved by the judge factory.
    #[serde(default = "default_rerank_provider")]
    pub provider: String,
    /// Only the top N candidates by embedding similarity are judged.
    #[serde(default = "default_rerank_top_candidates")]
    pub top_candidates: usize,
    #[serde(default = "default_rerank_weight")]
    pub weight: f64,
    /// Per-candidate judgment timeout.
    #[serde(default = "default_rerank_timeout_secs")]
    pub timeout_secs: f64,
}

impl Default for RerankingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_rerank_provider(),
            top_candidates: default_rerank_top_candidates(),
            weight: default_rerank_weight(),
            timeout_secs: default_rerank_timeout_secs(),
        }
    }
}

fn default_rerank_provider() -> String {
    "llm".to_string()
}

fn default_rerank_top_candidates() -> usize {
    5
}

fn default_rerank_weight() -> f64 {
    0.3
}

fn default_rerank_timeout_secs() -> f64 {
    5.0
}

/// Third-stage string-similarity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringSimilarityConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub algorithm: SimilarityAlgorithm,
    #[serde(default = "default_string_similarity_weight")]
    pub weight: f64,
    #[serde(default = "default_compare_fields")]
    pub compare_fields: Vec<CompareField>,
}

impl Default for StringSimilarityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            algorithm: SimilarityAlgorithm::default(),
            weight: default_string_similarity_weight(),
            compare_fields: default_compare_fields(),
        }
    }
}

fn default_string_similarity_weight() -> f64 {
    0.2
}

fn default_compare_fields() -> Vec<CompareField> {
    vec![CompareField::Description, CompareField::BestExample]
}

/// Score combination configuration shared by all scoring stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_embedding_weight")]
    pub embedding_weight: f64,
    /// Min-max normalize embedding scores across the gathered pool
    /// before combining.
    #[serde(default)]
    pub normalize_scores: bool,
    #[serde(default)]
    pub tie_breaker: TieBreaker,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            embedding_weight: default_embedding_weight(),
            normalize_scores: false,
            tie_breaker: TieBreaker::default(),
        }
    }
}

fn default_embedding_weight() -> f64 {
    0.5
}

/// Top-level router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    /// Backend adapter names to fan out to, in declaration order.
    #[serde(default)]
    pub child_adapters: Vec<String>,
    /// Matches below this selection score are discarded.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Per-backend candidate cap for the gather stage.
    #[serde(default = "default_max_templates_per_source")]
    pub max_templates_per_source: usize,
    /// Per-backend search timeout for the gather stage.
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: f64,
    #[serde(default)]
    pub reranking: RerankingConfig,
    #[serde(default)]
    pub string_similarity: StringSimilarityConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Directory of per-domain YAML configuration files.
    #[serde(default = "default_domain_config_dir")]
    pub domain_config_dir: String,
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_max_templates_per_source() -> usize {
    5
}

fn default_search_timeout_secs() -> f64 {
    2.0
}

fn default_domain_config_dir() -> String {
    "config/domains".to_string()
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            child_adapters: Vec::new(),
            confidence_threshold: default_confidence_threshold(),
            max_templates_per_source: default_max_templates_per_source(),
            search_timeout_secs: default_search_timeout_secs(),
            reranking: RerankingConfig::default(),
            string_similarity: StringSimilarityConfig::default(),
            scoring: ScoringConfig::default(),
            domain_config_dir: default_domain_config_dir(),
        }
    }
}

impl RouterSettings {
    /// Whether any stage beyond embedding similarity is active.
    pub fn multistage_enabled(&self) -> bool {
        self.reranking.enabled || self.string_similarity.enabled
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.search_timeout_secs)
    }

    pub fn rerank_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.reranking.timeout_secs)
    }

    /// Sum of the weights for the stages that are actually enabled.
    pub fn active_weight_sum(&self) -> f64 {
        let mut sum = self.scoring.embedding_weight;
        if self.reranking.enabled {
            sum += self.reranking.weight;
        }
        if self.string_similarity.enabled {
            sum += self.string_similarity.weight;
        }
        sum
    }

    /// Validate ranges and emit warnings for legal-but-suspicious
    /// combinations. Called once at construction time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "confidence_threshold".to_string(),
                message: format!("must be in [0, 1], got {}", self.confidence_threshold),
            });
        }
        if self.max_templates_per_source == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_templates_per_source".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.search_timeout_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "search_timeout_secs".to_string(),
                message: format!("must be positive, got {}", self.search_timeout_secs),
            });
        }
        for (field, weight) in [
            ("scoring.embedding_weight", self.scoring.embedding_weight),
            ("reranking.weight", self.reranking.weight),
            ("string_similarity.weight", self.string_similarity.weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("must be in [0, 1], got {weight}"),
                });
            }
        }
        if self.reranking.enabled && self.reranking.top_candidates == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reranking.top_candidates".to_string(),
                message: "must be at least 1 when reranking is enabled".to_string(),
            });
        }
        if self.reranking.enabled && self.reranking.timeout_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "reranking.timeout_secs".to_string(),
                message: format!("must be positive, got {}", self.reranking.timeout_secs),
            });
        }
        if self.string_similarity.enabled && self.string_similarity.compare_fields.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "string_similarity.compare_fields".to_string(),
                message: "must name at least one field when enabled".to_string(),
            });
        }

        if self.multistage_enabled() && !self.scoring.normalize_scores {
            let sum = self.active_weight_sum();
            if !(0.8..=1.2).contains(&sum) {
                tracing::warn!(
                    weight_sum = sum,
                    "active scoring weights sum outside [0.8, 1.2]; combined scores \
                     will be skewed"
                );
            }
        }
        if self.child_adapters.is_empty() {
            tracing::warn!("no child adapters configured; every query will yield no match");
        }
        Ok(())
    }

    /// Scoring configuration snapshot embedded in routing reports.
    pub fn scoring_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "confidence_threshold": self.confidence_threshold,
            "max_templates_per_source": self.max_templates_per_source,
            "embedding_weight": self.scoring.embedding_weight,
            "normalize_scores": self.scoring.normalize_scores,
            "tie_breaker": self.scoring.tie_breaker,
            "reranking": {
                "enabled": self.reranking.enabled,
                "provider": self.reranking.provider,
                "top_candidates": self.reranking.top_candidates,
                "weight": self.reranking.weight,
            },
            "string_similarity": {
                "enabled": self.string_similarity.enabled,
                "algorithm": self.string_similarity.algorithm,
                "weight": self.string_similarity.weight,
            },
        })
    }
}

/// Load settings from `config/default`, an optional per-environment
/// file, and `INTENT_ROUTER_`-prefixed environment variables.
pub fn load_settings(environment: RuntimeEnvironment) -> Result<RouterSettings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            File::with_name(&format!("config/{}", environment.as_str())).required(false),
        );

    let config = builder
        .add_source(
            Environment::with_prefix("INTENT_ROUTER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut settings: RouterSettings = config.try_deserialize()?;
    settings.environment = environment;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = RouterSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.confidence_threshold, 0.7);
        assert_eq!(settings.max_templates_per_source, 5);
        assert!(!settings.multistage_enabled());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let settings = RouterSettings {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "confidence_threshold"
        ));
    }

    #[test]
    fn zero_candidate_cap_rejected() {
        let settings = RouterSettings {
            max_templates_per_source: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rerank_weight_out_of_range_rejected() {
        let mut settings = RouterSettings::default();
        settings.reranking.weight = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn enabled_rerank_needs_candidates() {
        let mut settings = RouterSettings::default();
        settings.reranking.enabled = true;
        settings.reranking.top_candidates = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn active_weight_sum_tracks_enabled_stages() {
        let mut settings = RouterSettings::default();
        assert!((settings.active_weight_sum() - 0.5).abs() < f64::EPSILON);

        settings.reranking.enabled = true;
        assert!((settings.active_weight_sum() - 0.8).abs() < f64::EPSILON);

        settings.string_similarity.enabled = true;
        assert!((settings.active_weight_sum() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn skewed_weights_warn_but_validate() {
        let mut settings = RouterSettings::default();
        settings.reranking.enabled = true;
        settings.reranking.weight = 0.9;
        settings.scoring.embedding_weight = 0.9;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn timeouts_convert_to_duration() {
        let settings = RouterSettings::default();
        assert_eq!(settings.search_timeout(), Duration::from_secs(2));
        assert_eq!(settings.rerank_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn settings_deserialize_from_yaml() {
        let yaml = r#"
child_adapters: ["postgres", "search"]
confidence_threshold: 0.6
reranking:
  enabled: true
  top_candidates: 3
string_similarity:
  enabled: true
  algorithm: levenshtein
scoring:
  embedding_weight: 0.5
  normalize_scores: true
  tie_breaker: template_id_alphabetical
"#;
        let settings: RouterSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.child_adapters, vec!["postgres", "search"]);
        assert_eq!(settings.reranking.top_candidates, 3);
        assert_eq!(
            settings.string_similarity.algorithm,
            SimilarityAlgorithm::Levenshtein
        );
        assert_eq!(
            settings.scoring.tie_breaker,
            TieBreaker::TemplateIdAlphabetical
        );
        assert!(settings.validate().is_ok());
    }
}
