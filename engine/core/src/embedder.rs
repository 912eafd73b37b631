//! Embedding-model invocation is an external collaborator (spec §1
//! non-goals); this is the narrow contract the core consumes from it.

use async_trait::async_trait;

use crate::error::Result;

/// Turns a query (or chunk content) into a dense vector. Implementations
/// wrap whatever embedding backend the deployment uses; the engine never
/// calls a model directly.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A fixed-dimension embedder useful for tests and for `devnull` vector
/// store deployments where no real embedding backend is wired up.
pub struct NoOpEmbedder {
    dims: usize,
}

impl NoOpEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl Embedder for NoOpEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; self.dims])
    }
}
