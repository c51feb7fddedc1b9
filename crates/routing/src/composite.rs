//! Composite retriever
//!
//! The routing state machine over all configured backends:
//!
//! ```text
//! GATHER  embed once, fan out one search task per backend,
//!         join each with the search timeout
//! SCORE   multistage pipeline + domain boosts over the merged set
//! SELECT  best candidate at or above the confidence threshold
//! ROUTE   resolve the winner's adapter through the cached view
//! EXECUTE delegate to the owning backend (extraction happens there,
//!         on the winning template only)
//! FORMAT  rows -> context items with routing metadata
//! ```
//!
//! A backend that times out or fails in GATHER contributes zero
//! candidates and the query proceeds. The adapter map is cached at
//! construction and refreshed only by an explicit reload; queries
//! never read the live registry.

use std::collections::HashMap;
use std::sync::Arc;

use intent_router_config::{DomainConfig, RouterSettings};
use intent_router_core::{
    AdapterManager, CompositeRoutingMetadata, ContextItem, ContextMetadata, Embedder, Error,
    MatchReport, MultistageScoring, RelevanceJudge, ReloadReport, Result, RetrieveOptions,
    RoutingDecision, RoutingReport, SourceRetriever, Template, TemplateMatch,
};
use intent_router_strategy::{default_field_priority, StrategyRegistry};
use parking_lot::RwLock;
use serde_json::Value;

use crate::scoring::ScoringPipeline;

type AdapterMap = HashMap<String, Arc<dyn SourceRetriever>>;

pub struct CompositeRetriever {
    embedder: Arc<dyn Embedder>,
    manager: Arc<dyn AdapterManager>,
    settings: Arc<RouterSettings>,
    scoring: ScoringPipeline,
    strategies: StrategyRegistry,
    domain_configs: HashMap<String, DomainConfig>,
    adapters: RwLock<Arc<AdapterMap>>,
}

impl CompositeRetriever {
    /// Build the retriever and resolve the initial adapter view.
    /// Fails when no configured backend is resolvable.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        manager: Arc<dyn AdapterManager>,
        settings: Arc<RouterSettings>,
    ) -> Result<Self> {
        let adapters = resolve_adapters(manager.as_ref(), &settings.child_adapters);
        if adapters.is_empty() {
            return Err(Error::Configuration(
                "no configured child adapter is resolvable".to_string(),
            ));
        }
        tracing::info!(
            adapters = adapters.len(),
            configured = settings.child_adapters.len(),
            "composite retriever initialized"
        );
        Ok(Self {
            embedder,
            scoring: ScoringPipeline::new(settings.clone()),
            manager,
            settings,
            strategies: StrategyRegistry::default(),
            domain_configs: HashMap::new(),
            adapters: RwLock::new(Arc::new(adapters)),
        })
    }

    pub fn with_judge(mut self, judge: Arc<dyn RelevanceJudge>) -> Self {
        self.scoring = ScoringPipeline::new(self.settings.clone()).with_judge(judge);
        self
    }

    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    /// Domain configs keyed by adapter name.
    pub fn with_domain_configs(mut self, configs: HashMap<String, DomainConfig>) -> Self {
        self.domain_configs = configs;
        self
    }

    /// Full query path: route to exactly one backend and return its
    /// formatted rows. An empty result is the no-match outcome, not an
    /// error.
    pub async fn get_relevant_context(
        &self,
        query: &str,
        options: &RetrieveOptions,
    ) -> Result<Vec<ContextItem>> {
        let mut matches = self.gather(query).await?;
        if matches.is_empty() {
            tracing::info!(query, "no candidates from any backend");
            return Ok(Vec::new());
        }

        self.score(query, &mut matches).await;
        let total_matches = matches.len();

        let Some(winner) = self.scoring.select(&matches) else {
            tracing::info!(
                query,
                candidates = total_matches,
                threshold = self.settings.confidence_threshold,
                "no_matches_above_threshold"
            );
            return Ok(Vec::new());
        };

        let retriever = self
            .adapters
            .read()
            .get(&winner.source_adapter)
            .cloned()
            .ok_or_else(|| Error::Routing {
                adapter: winner.source_adapter.clone(),
                template_id: winner.template_id.clone(),
            })?;

        tracing::info!(
            adapter = %winner.source_adapter,
            template_id = %winner.template_id,
            selection_score = winner.selection_score(),
            "routing query"
        );
        let rows = retriever.retrieve(winner.template.clone(), query).await?;
        Ok(self.format_rows(&winner, rows, total_matches, options))
    }

    /// Diagnostic path: gather, score, select. No execution, no
    /// side effects on any backend.
    pub async fn test_routing(&self, query: &str) -> Result<RoutingReport> {
        let mut matches = self.gather(query).await?;
        self.score(query, &mut matches).await;

        matches.sort_by(|a, b| {
            b.selection_score()
                .partial_cmp(&a.selection_score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.source_adapter.cmp(&b.source_adapter))
                .then_with(|| a.template_id.cmp(&b.template_id))
        });

        let routing_decision = match self.scoring.select(&matches) {
            Some(winner) => RoutingDecision {
                would_route_to: Some(winner.source_adapter.clone()),
                selected_template: Some(winner.template_id.clone()),
                confidence: Some(winner.selection_score()),
                reason: None,
            },
            None => RoutingDecision::no_match(),
        };

        Ok(RoutingReport {
            query: query.to_string(),
            all_matches: matches.iter().map(MatchReport::from).collect(),
            routing_decision,
            configuration: self.settings.scoring_snapshot(),
        })
    }

    /// Re-resolve the configured adapters against the live manager and
    /// swap the cached view atomically.
    pub fn reload_child_adapters(&self) -> ReloadReport {
        let previous = sorted_names(&self.adapters.read());
        let current_map = resolve_adapters(self.manager.as_ref(), &self.settings.child_adapters);
        let current = {
            let mut names: Vec<String> = current_map.keys().cloned().collect();
            names.sort();
            names
        };
        *self.adapters.write() = Arc::new(current_map);

        let report = ReloadReport::from_sets(previous, current);
        tracing::info!(
            added = ?report.added,
            removed = ?report.removed,
            total_active = report.total_active,
            "reloaded child adapters"
        );
        report
    }

    /// GATHER: one task per backend, each joined with the search
    /// timeout. A slow or failing backend contributes nothing.
    async fn gather(&self, query: &str) -> Result<Vec<TemplateMatch>> {
        let adapters = self.adapters.read().clone();
        if adapters.is_empty() {
            return Err(Error::Configuration(
                "no child adapters in the cached view".to_string(),
            ));
        }

        let embedding = Arc::new(self.embedder.embed(query).await?);
        let timeout = self.settings.search_timeout();
        let cap = self.settings.max_templates_per_source;

        let mut tasks: Vec<(String, tokio::task::JoinHandle<SearchResult>)> =
            Vec::with_capacity(adapters.len());
        for (name, retriever) in adapters.iter() {
            let store = retriever.template_store();
            let embedding = embedding.clone();
            tasks.push((
                name.clone(),
                tokio::spawn(async move { store.search(&embedding, cap).await }),
            ));
        }

        let mut matches = Vec::new();
        for (name, mut handle) in tasks {
            match tokio::time::timeout(timeout, &mut handle).await {
                Ok(Ok(Ok(results))) => {
                    for (template, score) in results {
                        matches.push(TemplateMatch::new(template, &name, score));
                    }
                }
                Ok(Ok(Err(e))) => {
                    tracing::warn!(
                        adapter = %name,
                        stage = "gather",
                        error = %e,
                        "backend search failed; continuing without its candidates"
                    );
                }
                Ok(Err(join_error)) => {
                    tracing::warn!(
                        adapter = %name,
                        stage = "gather",
                        error = %join_error,
                        "backend search task panicked; continuing without its candidates"
                    );
                }
                Err(_) => {
                    handle.abort();
                    tracing::warn!(
                        adapter = %name,
                        stage = "gather",
                        timeout_secs = timeout.as_secs_f64(),
                        "backend search timed out; continuing without its candidates"
                    );
                }
            }
        }

        tracing::debug!(query, candidates = matches.len(), "gather complete");
        Ok(matches)
    }

    async fn score(&self, query: &str, matches: &mut [TemplateMatch]) {
        self.scoring.score(query, matches).await;
        self.scoring
            .apply_domain_boosts(query, matches, &self.strategies, &self.domain_configs);
    }

    fn format_rows(
        &self,
        winner: &TemplateMatch,
        rows: Vec<Value>,
        total_matches: usize,
        options: &RetrieveOptions,
    ) -> Vec<ContextItem> {
        let routing = CompositeRoutingMetadata {
            selected_adapter: winner.source_adapter.clone(),
            template_id: winner.template_id.clone(),
            similarity_score: winner.similarity_score,
            total_matches_found: total_matches,
            multistage_scoring: MultistageScoring {
                enabled: self.settings.multistage_enabled(),
                combined_score: winner.combined_score,
                embedding_score: winner.similarity_score,
                rerank_score: winner.rerank_score,
                string_similarity_score: winner.string_similarity_score,
            },
        };

        let limit = options.max_results.unwrap_or(usize::MAX);
        rows.into_iter()
            .take(limit)
            .map(|row| ContextItem {
                content: self.format_row(&winner.source_adapter, &winner.template, &row),
                metadata: ContextMetadata {
                    composite_routing: routing.clone(),
                    source_row: Some(row),
                },
            })
            .collect()
    }

    /// One row as readable text, fields ordered by the domain
    /// strategy's summary priority.
    fn format_row(&self, adapter: &str, template: &Template, row: &Value) -> String {
        let Some(object) = row.as_object() else {
            return row.to_string();
        };

        let config = self.domain_configs.get(adapter);
        let strategy = self.strategies.get_strategy(adapter, config);

        let mut fields: Vec<(&String, &Value)> = object.iter().collect();
        fields.sort_by(|(a, _), (b, _)| {
            let priority = |name: &str| match &strategy {
                Some(s) => {
                    s.summary_field_priority(name, config.and_then(|c| c.fields.get(name)))
                }
                None => default_field_priority(name),
            };
            priority(b).cmp(&priority(a)).then_with(|| a.cmp(b))
        });

        let summary = fields
            .iter()
            .map(|(name, value)| format!("{name}: {}", render_value(value)))
            .collect::<Vec<_>>()
            .join(", ");
        let label = if template.semantic_tags.primary_entity.is_empty() {
            template.id.as_str()
        } else {
            template.semantic_tags.primary_entity.as_str()
        };
        format!("[{label}] {summary}")
    }
}

type SearchResult = Result<Vec<(Arc<Template>, f64)>>;

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn sorted_names(map: &AdapterMap) -> Vec<String> {
    let mut names: Vec<String> = map.keys().cloned().collect();
    names.sort();
    names
}

fn resolve_adapters(manager: &dyn AdapterManager, configured: &[String]) -> AdapterMap {
    let mut adapters = AdapterMap::new();
    for name in configured {
        match manager.resolve(name) {
            Some(retriever) => {
                adapters.insert(name.clone(), retriever);
            }
            None => {
                tracing::warn!(adapter = %name, "configured adapter is not resolvable");
            }
        }
    }
    adapters
}
