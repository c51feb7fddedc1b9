//! Template search and execution collaborator contracts

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::template::Template;

/// Vector-similarity search over one backend's template library.
///
/// An empty store returns an empty list, never an error.
#[async_trait]
pub trait TemplateSearch: Send + Sync {
    /// Top `top_k` templates by descending cosine similarity.
    async fn search(&self, query_embedding: &[f32], top_k: usize)
        -> Result<Vec<(Arc<Template>, f64)>>;
}

/// Executes an approved template against its backend. Retry and backoff
/// are the implementation's own concern; the router sees rows or a
/// typed execution error.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        template: &Template,
        parameters: &HashMap<String, Value>,
    ) -> Result<Vec<Value>>;
}
