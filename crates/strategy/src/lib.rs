//! Domain strategies for the intent router
//!
//! A domain strategy bundles the heuristics that make routing smarter
//! for a known domain: named pattern matchers, signed score boosts,
//! parameter extraction keyed by parameter-name conventions, semantic
//! extractors, and summary field ranking.
//!
//! Built-ins cover commerce and geographic domains; any configured
//! domain without a dedicated strategy falls back to the config-driven
//! generic strategy. Custom strategies register at wiring time.

pub mod commerce;
pub mod generic;
pub mod geo;
pub mod registry;
pub mod strategy;

pub use commerce::CommerceStrategy;
pub use generic::GenericStrategy;
pub use geo::GeoStrategy;
pub use registry::StrategyRegistry;
pub use strategy::{default_field_priority, DomainStrategy, PatternMatcher, SemanticExtractor};
