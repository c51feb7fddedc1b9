//! Error taxonomy for the routing subsystem
//!
//! Only two conditions propagate as hard errors from a query:
//! total gather failure (no backend resolvable at all) and an
//! unresolvable winning adapter. Everything else is contained at the
//! candidate or backend level and surfaced through logs and scoring
//! details.

use thiserror::Error;

/// Router errors
#[derive(Error, Debug)]
pub enum Error {
    /// No backend resolvable at all. Fatal at initialization.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The winning template's adapter could not be resolved at routing
    /// time. Distinct from "no match": the scoring succeeded but the
    /// adapter map is stale.
    #[error("Adapter '{adapter}' unresolvable for template '{template_id}'")]
    Routing {
        adapter: String,
        template_id: String,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Template store error: {0}")]
    Store(String),

    #[error("Scoring error: {0}")]
    Scoring(String),

    /// Required parameters remained unresolved after the full
    /// extraction chain. Never silently defaulted.
    #[error("Missing required parameters for template '{template_id}': {parameters:?}")]
    MissingParameters {
        template_id: String,
        parameters: Vec<String>,
    },

    /// Backend execution failed after routing succeeded.
    #[error("Execution failed on adapter '{adapter}': {message}")]
    Execution { adapter: String, message: String },

    #[error("Template parse error: {0}")]
    TemplateParse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for conditions that should prompt an adapter reload.
    pub fn is_stale_routing(&self) -> bool {
        matches!(self, Error::Routing { .. })
    }
}
