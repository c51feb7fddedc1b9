//! Scored candidates and routing metadata
//!
//! A [`TemplateMatch`] exists only for the lifetime of one query. The
//! combined score is a pure function of the sub-scores and the scoring
//! configuration; nothing here may depend on the order in which backend
//! tasks completed.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::Template;

/// Per-stage score breakdown attached to every candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringDetails {
    /// Embedding sub-score after min-max normalization, when enabled.
    pub normalized_embedding: Option<f64>,
    pub normalized_rerank: Option<f64>,
    pub normalized_string_similarity: Option<f64>,
    /// Weights that were actually applied.
    pub embedding_weight: f64,
    pub rerank_weight: f64,
    pub string_similarity_weight: f64,
    /// Signed delta contributed by the domain strategy.
    pub domain_boost: f64,
}

/// One template's scored result for a specific query.
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    pub template_id: String,
    pub source_adapter: String,
    pub template: Arc<Template>,
    /// Cosine similarity from the owning store, in [0, 1].
    pub similarity_score: f64,
    /// Second-pass LLM judgment; absent if the stage is disabled or the
    /// call for this candidate failed.
    pub rerank_score: Option<f64>,
    pub string_similarity_score: Option<f64>,
    /// Weighted combination; present only when multistage scoring ran.
    pub combined_score: Option<f64>,
    pub scoring_details: ScoringDetails,
}

impl TemplateMatch {
    pub fn new(template: Arc<Template>, source_adapter: &str, similarity: f64) -> Self {
        Self {
            template_id: template.id.clone(),
            source_adapter: source_adapter.to_string(),
            template,
            similarity_score: similarity,
            rerank_score: None,
            string_similarity_score: None,
            combined_score: None,
            scoring_details: ScoringDetails::default(),
        }
    }

    /// The score selection filters and sorts on: the combined score when
    /// multistage scoring ran, the raw embedding similarity otherwise,
    /// plus the domain boost in both cases.
    pub fn selection_score(&self) -> f64 {
        self.combined_score.unwrap_or(self.similarity_score) + self.scoring_details.domain_boost
    }
}

/// Multistage scoring summary carried on every returned context item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultistageScoring {
    pub enabled: bool,
    pub combined_score: Option<f64>,
    pub embedding_score: f64,
    pub rerank_score: Option<f64>,
    pub string_similarity_score: Option<f64>,
}

/// Routing metadata attached to every context item under
/// `metadata.composite_routing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeRoutingMetadata {
    pub selected_adapter: String,
    pub template_id: String,
    pub similarity_score: f64,
    pub total_matches_found: usize,
    pub multistage_scoring: MultistageScoring,
}

/// Item-level metadata. `composite_routing` is always present on items
/// produced by the composite retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub composite_routing: CompositeRoutingMetadata,
    /// The backend row this item was formatted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_row: Option<Value>,
}

/// One formatted result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub content: String,
    pub metadata: ContextMetadata,
}

/// Options accepted by `get_relevant_context`.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    pub api_key: Option<String>,
    pub collection_name: Option<String>,
    pub max_results: Option<usize>,
}

/// The decision part of a `test_routing` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub would_route_to: Option<String>,
    pub selected_template: Option<String>,
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RoutingDecision {
    pub fn no_match() -> Self {
        Self {
            would_route_to: None,
            selected_template: None,
            confidence: None,
            reason: Some("no_matches_above_threshold".to_string()),
        }
    }
}

/// One candidate's scores as reported by `test_routing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub template_id: String,
    pub source_adapter: String,
    pub similarity_score: f64,
    pub rerank_score: Option<f64>,
    pub string_similarity_score: Option<f64>,
    pub combined_score: Option<f64>,
    pub selection_score: f64,
    pub domain_boost: f64,
}

impl From<&TemplateMatch> for MatchReport {
    fn from(m: &TemplateMatch) -> Self {
        Self {
            template_id: m.template_id.clone(),
            source_adapter: m.source_adapter.clone(),
            similarity_score: m.similarity_score,
            rerank_score: m.rerank_score,
            string_similarity_score: m.string_similarity_score,
            combined_score: m.combined_score,
            selection_score: m.selection_score(),
            domain_boost: m.scoring_details.domain_boost,
        }
    }
}

/// Full diagnostic report: gather + score + select, no execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingReport {
    pub query: String,
    pub all_matches: Vec<MatchReport>,
    pub routing_decision: RoutingDecision,
    /// Snapshot of the active scoring configuration.
    pub configuration: Value,
}

/// Result of an adapter reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadReport {
    pub previous_adapters: Vec<String>,
    pub current_adapters: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub total_active: usize,
}

impl ReloadReport {
    /// Diff two adapter name sets into a report.
    pub fn from_sets(previous: Vec<String>, current: Vec<String>) -> Self {
        let prev: BTreeSet<&String> = previous.iter().collect();
        let curr: BTreeSet<&String> = current.iter().collect();
        let added = curr.difference(&prev).map(|s| (*s).clone()).collect();
        let removed = prev.difference(&curr).map(|s| (*s).clone()).collect();
        let total_active = current.len();
        Self {
            previous_adapters: previous,
            current_adapters: current,
            added,
            removed,
            total_active,
        }
    }
}
