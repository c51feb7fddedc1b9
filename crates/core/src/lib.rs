//! Core traits and types for the intent router
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits for pluggable backends (embedder, template
//!   search, adapters, LLM capabilities)
//! - The template data model and YAML template sets
//! - Scored-candidate and routing-metadata types
//! - Error types

pub mod error;
pub mod matching;
pub mod template;
pub mod traits;

pub use error::{Error, Result};
pub use matching::{
    CompositeRoutingMetadata, ContextItem, ContextMetadata, MatchReport, MultistageScoring,
    ReloadReport, RetrieveOptions, RoutingDecision, RoutingReport, ScoringDetails, TemplateMatch,
};
pub use template::{
    ParameterSpec, ParameterType, QueryDefinition, SemanticTags, Template, TemplateSet,
};
pub use traits::{
    AdapterManager, Embedder, ExtractionModel, QueryExecutor, RelevanceJudge, SourceRetriever,
    TemplateSearch,
};
