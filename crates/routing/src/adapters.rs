//! Live adapter registry
//!
//! The registry is the authoritative name -> backend mapping and may
//! change at runtime. The composite retriever never reads it on the
//! query path; it holds its own cached view and refreshes it only
//! through an explicit reload.

use std::collections::HashMap;
use std::sync::Arc;

use intent_router_core::{AdapterManager, Error, Result, SourceRetriever};
use parking_lot::RwLock;

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn SourceRetriever>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own name. Names are unique;
    /// re-registering a live name is a configuration error.
    pub fn register(&self, adapter: Arc<dyn SourceRetriever>) -> Result<()> {
        let name = adapter.name().to_string();
        if name.is_empty() {
            return Err(Error::Configuration(
                "adapter name must not be empty".to_string(),
            ));
        }
        let mut adapters = self.adapters.write();
        if adapters.contains_key(&name) {
            return Err(Error::Configuration(format!(
                "adapter '{name}' is already registered"
            )));
        }
        tracing::debug!(adapter = %name, "registered adapter");
        adapters.insert(name, adapter);
        Ok(())
    }

    /// Remove a backend. Queries against a stale cached view will see
    /// a routing error until the composite reloads.
    pub fn deregister(&self, name: &str) -> Option<Arc<dyn SourceRetriever>> {
        let removed = self.adapters.write().remove(name);
        if removed.is_some() {
            tracing::debug!(adapter = %name, "deregistered adapter");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.adapters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.read().is_empty()
    }
}

impl AdapterManager for AdapterRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn SourceRetriever>> {
        self.adapters.read().get(name).cloned()
    }

    fn adapter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.read().keys().cloned().collect();
        names.sort();
        names
    }
}
