//! Second-pass LLM reranking
//!
//! Only the top candidates by embedding similarity are judged. Every
//! judgment runs as its own timeout-bounded call; a failure or
//! timeout leaves that one candidate's rerank score absent and the
//! query proceeds.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use intent_router_config::RerankingConfig;
use intent_router_core::{RelevanceJudge, TemplateMatch};

pub struct Reranker {
    judge: Arc<dyn RelevanceJudge>,
    config: RerankingConfig,
}

impl Reranker {
    pub fn new(judge: Arc<dyn RelevanceJudge>, config: RerankingConfig) -> Self {
        Self { judge, config }
    }

    pub fn provider(&self) -> &str {
        self.judge.provider()
    }

    /// Candidate text handed to the judge: description plus the
    /// canonical example.
    fn candidate_text(m: &TemplateMatch) -> String {
        match m.template.best_example() {
            Some(example) => format!("{}\n{}", m.template.description, example),
            None => m.template.description.clone(),
        }
    }

    /// Judge the top `top_candidates` matches and write their rerank
    /// scores in place. Untouched candidates keep `None`.
    pub async fn rerank(&self, query: &str, matches: &mut [TemplateMatch]) {
        if !self.config.enabled || matches.is_empty() {
            return;
        }

        let mut order: Vec<usize> = (0..matches.len()).collect();
        order.sort_by(|&a, &b| {
            matches[b]
                .similarity_score
                .partial_cmp(&matches[a].similarity_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| matches[a].template_id.cmp(&matches[b].template_id))
        });
        order.truncate(self.config.top_candidates);

        let timeout = std::time::Duration::from_secs_f64(self.config.timeout_secs);
        let judgments = order.iter().map(|&i| {
            let judge = self.judge.clone();
            let query = query.to_string();
            let text = Self::candidate_text(&matches[i]);
            let template_id = matches[i].template_id.clone();
            async move {
                match tokio::time::timeout(timeout, judge.judge(&query, &text)).await {
                    Ok(Ok(score)) => Some(score.clamp(0.0, 1.0)),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            template_id = %template_id,
                            stage = "rerank",
                            error = %e,
                            "rerank judgment failed; candidate keeps embedding score only"
                        );
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            template_id = %template_id,
                            stage = "rerank",
                            timeout_secs = timeout.as_secs_f64(),
                            "rerank judgment timed out"
                        );
                        None
                    }
                }
            }
        });

        let scores = join_all(judgments).await;
        for (&i, score) in order.iter().zip(scores) {
            matches[i].rerank_score = score;
        }
    }
}
