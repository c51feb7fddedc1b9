//! Strategy registry
//!
//! Maps domain names, aliases, and configured domain types to
//! strategy instances. Population happens through explicit
//! registration calls at wiring time; resolution order is custom
//! strategies first, then built-ins, then the generic fallback for
//! any domain that at least carries a config.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use intent_router_config::DomainConfig;
use intent_router_core::{Error, Result};

use crate::commerce::CommerceStrategy;
use crate::generic::GenericStrategy;
use crate::geo::GeoStrategy;
use crate::strategy::DomainStrategy;

pub struct StrategyRegistry {
    custom: HashMap<String, Arc<dyn DomainStrategy>>,
    builtins: HashMap<String, Arc<dyn DomainStrategy>>,
    generic: Arc<GenericStrategy>,
}

impl StrategyRegistry {
    /// Empty registry: no built-ins, generic fallback only.
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            builtins: HashMap::new(),
            generic: Arc::new(GenericStrategy::new()),
        }
    }

    /// Registry with the built-in strategies registered under their
    /// names and aliases.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.add_builtin(Arc::new(CommerceStrategy::new()));
        registry.add_builtin(Arc::new(GeoStrategy::new()));
        registry
    }

    fn add_builtin(&mut self, strategy: Arc<dyn DomainStrategy>) {
        self.builtins
            .insert(strategy.name().to_lowercase(), strategy.clone());
        for alias in strategy.aliases() {
            self.builtins.insert(alias.to_lowercase(), strategy.clone());
        }
    }

    /// Register a custom strategy under a domain name or type key.
    /// The trait bound is the capability check; registration itself
    /// only rejects unusable keys.
    pub fn register_strategy(
        &mut self,
        key: &str,
        strategy: Arc<dyn DomainStrategy>,
    ) -> Result<()> {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return Err(Error::Configuration(
                "strategy key must be non-empty".to_string(),
            ));
        }
        if self.custom.contains_key(&key) {
            return Err(Error::Configuration(format!(
                "strategy already registered for '{key}'"
            )));
        }
        tracing::debug!(key = %key, strategy = strategy.name(), "registered domain strategy");
        self.custom.insert(key, strategy);
        Ok(())
    }

    /// Resolve a strategy for a domain. Custom strategies keyed by
    /// the configured domain type win; then built-ins by domain name,
    /// alias, or domain type; then the generic fallback when a domain
    /// config exists at all.
    pub fn get_strategy(
        &self,
        domain_name: &str,
        domain_config: Option<&DomainConfig>,
    ) -> Option<Arc<dyn DomainStrategy>> {
        if let Some(config) = domain_config {
            let type_key = config.domain_type.to_lowercase();
            if let Some(strategy) = self.custom.get(&type_key) {
                return Some(strategy.clone());
            }
        }

        let name_key = domain_name.to_lowercase();
        if let Some(strategy) = self.builtins.get(&name_key) {
            return Some(strategy.clone());
        }
        if let Some(config) = domain_config {
            if let Some(strategy) = self.builtins.get(&config.domain_type.to_lowercase()) {
                return Some(strategy.clone());
            }
            return Some(self.generic.clone());
        }

        None
    }

    /// Sorted union of every name, alias, and custom key that
    /// resolves to a strategy.
    pub fn list_available_domains(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        names.extend(self.builtins.keys().cloned());
        names.extend(self.custom.keys().cloned());
        names.into_iter().collect()
    }

    pub fn generic(&self) -> Arc<dyn DomainStrategy> {
        self.generic.clone()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
