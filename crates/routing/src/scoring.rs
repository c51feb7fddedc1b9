//! Multi-stage scoring and selection
//!
//! Stage 1 (embedding similarity) arrives with the candidates. Stage 2
//! (reranking) and stage 3 (string similarity) fill in optional
//! sub-scores. Combination is a pure function of the sub-scores and
//! the configuration; selection filters on the confidence threshold
//! and breaks exact ties with the configured, named tie-breaker so the
//! winner never depends on task completion order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use intent_router_config::{DomainConfig, RouterSettings, TieBreaker};
use intent_router_core::{RelevanceJudge, TemplateMatch};
use intent_router_strategy::StrategyRegistry;

use crate::rerank::Reranker;
use crate::string_sim::best_field_similarity;

pub struct ScoringPipeline {
    settings: Arc<RouterSettings>,
    reranker: Option<Reranker>,
}

impl ScoringPipeline {
    pub fn new(settings: Arc<RouterSettings>) -> Self {
        Self {
            settings,
            reranker: None,
        }
    }

    /// Attach the judge backing the reranking stage. Without one the
    /// stage is skipped even when enabled in configuration.
    pub fn with_judge(mut self, judge: Arc<dyn RelevanceJudge>) -> Self {
        self.reranker = Some(Reranker::new(judge, self.settings.reranking.clone()));
        self
    }

    /// Run stages 2 and 3 and combine. Mutates candidates in place.
    pub async fn score(&self, query: &str, matches: &mut [TemplateMatch]) {
        if matches.is_empty() {
            return;
        }
        if let Some(reranker) = &self.reranker {
            reranker.rerank(query, matches).await;
        }
        if self.settings.string_similarity.enabled {
            for m in matches.iter_mut() {
                m.string_similarity_score =
                    best_field_similarity(query, &m.template, &self.settings.string_similarity);
            }
        }
        self.combine(matches);
    }

    /// Weighted combination over the candidate set. Absent sub-scores
    /// contribute zero; min-max normalization applies per sub-score
    /// across the set when configured.
    pub fn combine(&self, matches: &mut [TemplateMatch]) {
        let multistage = self.settings.multistage_enabled();
        let w_e = self.settings.scoring.embedding_weight;
        let w_r = if self.settings.reranking.enabled {
            self.settings.reranking.weight
        } else {
            0.0
        };
        let w_s = if self.settings.string_similarity.enabled {
            self.settings.string_similarity.weight
        } else {
            0.0
        };

        let embeddings: Vec<Option<f64>> =
            matches.iter().map(|m| Some(m.similarity_score)).collect();
        let reranks: Vec<Option<f64>> = matches.iter().map(|m| m.rerank_score).collect();
        let string_sims: Vec<Option<f64>> =
            matches.iter().map(|m| m.string_similarity_score).collect();

        let (norm_e, norm_r, norm_s) = if self.settings.scoring.normalize_scores {
            (min_max(&embeddings), min_max(&reranks), min_max(&string_sims))
        } else {
            (embeddings, reranks, string_sims)
        };

        for (i, m) in matches.iter_mut().enumerate() {
            m.scoring_details.embedding_weight = w_e;
            m.scoring_details.rerank_weight = w_r;
            m.scoring_details.string_similarity_weight = w_s;
            if !multistage {
                continue;
            }
            m.scoring_details.normalized_embedding = norm_e[i];
            m.scoring_details.normalized_rerank = norm_r[i];
            m.scoring_details.normalized_string_similarity = norm_s[i];
            m.combined_score = Some(
                norm_e[i].unwrap_or(0.0) * w_e
                    + norm_r[i].unwrap_or(0.0) * w_r
                    + norm_s[i].unwrap_or(0.0) * w_s,
            );
        }
    }

    /// Resolve each candidate's domain strategy and record its signed
    /// boost.
    pub fn apply_domain_boosts(
        &self,
        query: &str,
        matches: &mut [TemplateMatch],
        registry: &StrategyRegistry,
        domain_configs: &HashMap<String, DomainConfig>,
    ) {
        for m in matches.iter_mut() {
            let config = domain_configs.get(&m.source_adapter);
            let Some(strategy) = registry.get_strategy(&m.source_adapter, config) else {
                continue;
            };
            let boost = strategy.calculate_domain_boost(m, query, config);
            if boost != 0.0 {
                tracing::trace!(
                    template_id = %m.template_id,
                    adapter = %m.source_adapter,
                    strategy = strategy.name(),
                    boost,
                    "applied domain boost"
                );
            }
            m.scoring_details.domain_boost = boost;
        }
    }

    /// Best candidate at or above the confidence threshold, or none.
    pub fn select(&self, matches: &[TemplateMatch]) -> Option<TemplateMatch> {
        let threshold = self.settings.confidence_threshold;
        let tie_breaker = self.settings.scoring.tie_breaker;
        matches
            .iter()
            .filter(|m| m.selection_score() >= threshold)
            .min_by(|a, b| compare_candidates(a, b, tie_breaker))
            .cloned()
    }
}

/// Total order over candidates: higher selection score first, then
/// the named tie-breaker. Exact score ties never fall back to input
/// order.
fn compare_candidates(a: &TemplateMatch, b: &TemplateMatch, tie_breaker: TieBreaker) -> Ordering {
    b.selection_score()
        .partial_cmp(&a.selection_score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| match tie_breaker {
            TieBreaker::SourceAdapterAlphabetical => a
                .source_adapter
                .cmp(&b.source_adapter)
                .then_with(|| a.template_id.cmp(&b.template_id)),
            TieBreaker::TemplateIdAlphabetical => a
                .template_id
                .cmp(&b.template_id)
                .then_with(|| a.source_adapter.cmp(&b.source_adapter)),
        })
}

fn min_max(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let Some(first) = present.first() else {
        return values.to_vec();
    };
    let (min, max) = present
        .iter()
        .fold((*first, *first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if (max - min).abs() < f64::EPSILON {
        return values.iter().map(|v| v.map(|_| 1.0)).collect();
    }
    values
        .iter()
        .map(|v| v.map(|x| (x - min) / (max - min)))
        .collect()
}
