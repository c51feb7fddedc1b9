//! In-memory template store
//!
//! One store per backend. Templates are embedded once at indexing
//! time and searched by cosine similarity; the store is read-only
//! from the router's side after that. Scores are clamped to [0, 1]
//! so downstream weighting never sees a negative similarity.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use intent_router_core::{Embedder, Error, Result, Template, TemplateSearch, TemplateSet};

struct IndexedTemplate {
    template: Arc<Template>,
    embedding: Vec<f32>,
}

/// Aggregate counts exposed for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    pub name: String,
    pub template_count: usize,
    pub dimension: usize,
    /// Template count per query engine tag.
    pub engines: BTreeMap<String, usize>,
}

pub struct InMemoryTemplateStore {
    name: String,
    dimension: usize,
    entries: Vec<IndexedTemplate>,
}

impl InMemoryTemplateStore {
    /// Index a template set by embedding each template's description
    /// and examples.
    pub async fn index(
        name: &str,
        set: &TemplateSet,
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        let dimension = embedder.dimension();
        let mut entries = Vec::with_capacity(set.len());
        for template in &set.templates {
            let embedding = embedder.embed(&template.embedding_text()).await?;
            if embedding.len() != dimension {
                return Err(Error::Store(format!(
                    "embedder produced {} dims for template '{}', store expects {}",
                    embedding.len(),
                    template.id,
                    dimension
                )));
            }
            entries.push(IndexedTemplate {
                template: Arc::new(template.clone()),
                embedding,
            });
        }
        tracing::debug!(
            store = name,
            templates = entries.len(),
            dimension,
            "indexed template store"
        );
        Ok(Self {
            name: name.to_string(),
            dimension,
            entries,
        })
    }

    /// Index templates loaded from a YAML file.
    pub async fn from_yaml_file(
        name: &str,
        path: &Path,
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        let set = TemplateSet::from_yaml_file(path)?;
        Self::index(name, &set, embedder).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statistics(&self) -> StoreStatistics {
        let mut engines: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &self.entries {
            *engines.entry(entry.template.query.engine.clone()).or_insert(0) += 1;
        }
        StoreStatistics {
            name: self.name.clone(),
            template_count: self.entries.len(),
            dimension: self.dimension,
            engines,
        }
    }
}

#[async_trait]
impl TemplateSearch for InMemoryTemplateStore {
    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(Arc<Template>, f64)>> {
        if query_embedding.len() != self.dimension {
            return Err(Error::Store(format!(
                "query embedding has {} dims, store '{}' expects {}",
                query_embedding.len(),
                self.name,
                self.dimension
            )));
        }

        let mut scored: Vec<(Arc<Template>, f64)> = self
            .entries
            .iter()
            .map(|entry| {
                let score = cosine_similarity(query_embedding, &entry.embedding).clamp(0.0, 1.0);
                (entry.template.clone(), score)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
