//! Narrow LLM capability contracts
//!
//! Reranking and LLM-backed parameter extraction are injected behind
//! these interfaces so the scoring pipeline and the extractor stay
//! unit-testable with deterministic stubs.

use async_trait::async_trait;

use crate::error::Result;
use crate::template::Template;

/// Second-pass relevance judgment over a query/candidate pair.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    /// Relevance in [0, 1]. A failure here is contained to the one
    /// candidate being judged.
    async fn judge(&self, query: &str, candidate_text: &str) -> Result<f64>;

    /// Provider label for logs and reports.
    fn provider(&self) -> &str;
}

/// LLM-backed parameter extraction, constrained to a template's
/// declared parameters.
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    /// Raw model output expected to contain a JSON object mapping
    /// parameter names to values. The caller parses defensively.
    async fn extract(&self, query: &str, template: &Template) -> Result<String>;
}
