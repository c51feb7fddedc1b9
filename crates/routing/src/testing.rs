//! Deterministic collaborator stubs
//!
//! Every external contract (embedder, store, judge, executor) has a
//! stub here so the pipeline can be exercised without models or
//! backends. Used by this crate's own tests and by downstream
//! integration tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use intent_router_core::{
    Embedder, Error, ExtractionModel, QueryExecutor, RelevanceJudge, Result, Template,
    TemplateSearch,
};
use parking_lot::Mutex;
use serde_json::Value;

/// Hashed bag-of-words embedder. Same text always embeds to the same
/// vector; texts sharing tokens land near each other.
pub struct KeywordEmbedder {
    dimension: usize,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self { dimension: 64 }
    }
}

impl KeywordEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.to_lowercase().split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if token.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Store stub returning preset (template, score) pairs regardless of
/// the query embedding. Optionally sleeps first to trigger gather
/// timeouts.
pub struct FixedScoreStore {
    results: Vec<(Arc<Template>, f64)>,
    delay: Option<Duration>,
    fail: bool,
}

impl FixedScoreStore {
    pub fn new(results: Vec<(Arc<Template>, f64)>) -> Self {
        Self {
            results,
            delay: None,
            fail: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            delay: None,
            fail: true,
        }
    }
}

#[async_trait]
impl TemplateSearch for FixedScoreStore {
    async fn search(
        &self,
        _query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(Arc<Template>, f64)>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::Store("stub store failure".to_string()));
        }
        let mut results = self.results.clone();
        results.truncate(top_k);
        Ok(results)
    }
}

/// Judge stub scoring by template-id substring lookup; unknown text
/// scores the fallback value.
pub struct TableJudge {
    scores: HashMap<String, f64>,
    fallback: f64,
}

impl TableJudge {
    pub fn new(scores: HashMap<String, f64>) -> Self {
        Self {
            scores,
            fallback: 0.0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }
}

#[async_trait]
impl RelevanceJudge for TableJudge {
    async fn judge(&self, _query: &str, candidate_text: &str) -> Result<f64> {
        for (needle, score) in &self.scores {
            if candidate_text.contains(needle.as_str()) {
                return Ok(*score);
            }
        }
        Ok(self.fallback)
    }

    fn provider(&self) -> &str {
        "table-stub"
    }
}

/// Judge stub that always errors, for failure-containment tests.
pub struct FailingJudge;

#[async_trait]
impl RelevanceJudge for FailingJudge {
    async fn judge(&self, _query: &str, _candidate_text: &str) -> Result<f64> {
        Err(Error::Scoring("stub judge failure".to_string()))
    }

    fn provider(&self) -> &str {
        "failing-stub"
    }
}

/// Judge stub that sleeps past any reasonable timeout.
pub struct SlowJudge(pub Duration);

#[async_trait]
impl RelevanceJudge for SlowJudge {
    async fn judge(&self, _query: &str, _candidate_text: &str) -> Result<f64> {
        tokio::time::sleep(self.0).await;
        Ok(1.0)
    }

    fn provider(&self) -> &str {
        "slow-stub"
    }
}

/// Extraction stub returning a fixed raw response for every call.
pub struct ScriptedExtractor {
    response: String,
}

impl ScriptedExtractor {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

#[async_trait]
impl ExtractionModel for ScriptedExtractor {
    async fn extract(&self, _query: &str, _template: &Template) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// Extraction stub that always errors.
pub struct FailingExtractor;

#[async_trait]
impl ExtractionModel for FailingExtractor {
    async fn extract(&self, _query: &str, _template: &Template) -> Result<String> {
        Err(Error::Scoring("stub extractor failure".to_string()))
    }
}

/// Executor stub returning canned rows and recording every call.
pub struct CannedExecutor {
    rows: Vec<Value>,
    calls: Mutex<Vec<(String, HashMap<String, Value>)>>,
}

impl CannedExecutor {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (template_id, parameters) for each execution so far.
    pub fn calls(&self) -> Vec<(String, HashMap<String, Value>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl QueryExecutor for CannedExecutor {
    async fn execute(
        &self,
        template: &Template,
        parameters: &HashMap<String, Value>,
    ) -> Result<Vec<Value>> {
        self.calls
            .lock()
            .push((template.id.clone(), parameters.clone()));
        Ok(self.rows.clone())
    }
}

/// Build a template from inline YAML for test setup.
pub fn template_from_yaml(yaml: &str) -> Arc<Template> {
    let set = intent_router_core::TemplateSet::from_yaml(yaml).expect("test template yaml");
    Arc::new(set.templates.into_iter().next().expect("one template"))
}
