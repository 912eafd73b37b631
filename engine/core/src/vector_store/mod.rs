//! Vector store adapter (§4.3): add/delete/similarity-search/get-by-id over
//! chunks, with relational-vector (pgvector), managed-search, and dev-null
//! variants.

mod azure_search;
mod devnull;
mod pgvector_store;

pub use azure_search::{AzureSearchConfig, AzureSearchStore};
pub use devnull::DevNullVectorStore;
pub use pgvector_store::PgVectorStore;

use async_trait::async_trait;

use crate::chunk::{Chunk, VectorStoreFilter};
use crate::error::Result;

/// Common contract implemented by every vector store variant.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Adds a batch of chunks. Atomic from the caller's viewpoint: on
    /// failure the whole batch is reported as failed and may be retried
    /// wholesale (§4.3).
    async fn add_documents(&self, chunks: &[Chunk]) -> Result<()>;

    /// Removes every chunk whose `doc_id` metadata equals `doc_id`. A no-op
    /// if the id is unknown.
    async fn delete(&self, doc_id: &str) -> Result<()>;

    /// Returns up to `k` chunks matching `filter`, ordered by decreasing
    /// similarity to `query_embedding`.
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&VectorStoreFilter>,
    ) -> Result<Vec<Chunk>>;

    /// Returns the chunks whose primary ids are in `ids`, in unspecified
    /// order. Unknown ids are silently dropped.
    async fn get_documents(&self, ids: &[String]) -> Result<Vec<Chunk>>;
}
