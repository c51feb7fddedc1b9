//! Embedding collaborator contract

use async_trait::async_trait;

use crate::error::Result;

/// Text to fixed-length vector. The model itself is external; the
/// router only depends on this boundary.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of vectors produced by `embed`.
    fn dimension(&self) -> usize;
}
