//! Single-source retriever
//!
//! One backend's template store plus its execution path. Retrieval on
//! a selected template runs parameter extraction first, then hands the
//! template and resolved parameters to the backend's executor.

use std::sync::Arc;

use async_trait::async_trait;
use intent_router_core::{
    Error, QueryExecutor, Result, SourceRetriever, Template, TemplateSearch,
};
use serde_json::Value;

use crate::extraction::ParameterExtractor;

pub struct TemplateBackend {
    name: String,
    store: Arc<dyn TemplateSearch>,
    executor: Arc<dyn QueryExecutor>,
    extractor: ParameterExtractor,
}

impl TemplateBackend {
    pub fn new(
        name: &str,
        store: Arc<dyn TemplateSearch>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            name: name.to_string(),
            store,
            executor,
            extractor: ParameterExtractor::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: ParameterExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Store search with a per-source candidate cap.
    pub async fn search_templates(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(Arc<Template>, f64)>> {
        self.store.search(query_embedding, limit).await
    }
}

#[async_trait]
impl SourceRetriever for TemplateBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn template_store(&self) -> Arc<dyn TemplateSearch> {
        self.store.clone()
    }

    async fn retrieve(&self, template: Arc<Template>, query: &str) -> Result<Vec<Value>> {
        let parameters = self.extractor.extract(query, &template).await?;
        tracing::debug!(
            adapter = %self.name,
            template_id = %template.id,
            parameters = ?parameters.keys().collect::<Vec<_>>(),
            "executing selected template"
        );

        let rows = self
            .executor
            .execute(&template, &parameters)
            .await
            .map_err(|e| match e {
                Error::Execution { .. } => e,
                other => Error::Execution {
                    adapter: self.name.clone(),
                    message: other.to_string(),
                },
            })?;

        tracing::info!(
            adapter = %self.name,
            template_id = %template.id,
            rows = rows.len(),
            "template executed"
        );
        Ok(rows)
    }
}
