//! Configuration management for the intent router
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml` plus per-environment overlays)
//! - Environment variables (`INTENT_ROUTER_` prefix, `__` nesting)
//!
//! # Domain Configuration
//!
//! Per-backend domain configuration lives in YAML files under the
//! configured domain directory (one file per backend):
//! - `domain_name` must match the adapter name
//! - `domain_type` selects the extraction strategy
//! - `fields` declare enum vocabularies and alias tables
//! - `boost` declares vocabulary terms that nudge scoring

pub mod domain;
pub mod settings;

pub use domain::{
    load_domain_configs, BoostTerm, DomainBoostConfig, DomainConfig, EntityConfig, FieldConfig,
};
pub use settings::{
    load_settings, CompareField, RerankingConfig, RouterSettings, RuntimeEnvironment,
    ScoringConfig, SimilarityAlgorithm, StringSimilarityConfig, TieBreaker,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingField(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}
