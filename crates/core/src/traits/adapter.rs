//! Backend adapter contracts
//!
//! A source retriever owns one backend's template store and execution
//! path. The adapter manager resolves names to live instances; the
//! composite retriever only ever holds a cached, explicitly refreshed
//! view of that mapping.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::template::Template;
use crate::traits::search::TemplateSearch;

/// One backend's retrieval surface.
#[async_trait]
pub trait SourceRetriever: Send + Sync {
    /// Stable adapter name used for routing.
    fn name(&self) -> &str;

    /// The backend's template store. Read-only from the router's side.
    fn template_store(&self) -> Arc<dyn TemplateSearch>;

    /// Full execution path for a selected template: parameter
    /// extraction, query execution, row collection.
    async fn retrieve(&self, template: Arc<Template>, query: &str) -> Result<Vec<Value>>;
}

/// Resolves backend names to live retriever instances.
pub trait AdapterManager: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn SourceRetriever>>;

    /// Names of all currently registered adapters.
    fn adapter_names(&self) -> Vec<String>;
}
