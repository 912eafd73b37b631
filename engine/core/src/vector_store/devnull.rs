use async_trait::async_trait;

use super::VectorStore;
use crate::chunk::{Chunk, VectorStoreFilter};
use crate::error::Result;

/// Accepts writes silently, returns empty results. Used when no vector
/// backend is wired up but callers still want a uniform
/// `Arc<dyn VectorStore>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevNullVectorStore;

#[async_trait]
impl VectorStore for DevNullVectorStore {
    async fn add_documents(&self, _chunks: &[Chunk]) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _doc_id: &str) -> Result<()> {
        Ok(())
    }

    async fn similarity_search(
        &self,
        _query_embedding: &[f32],
        _k: usize,
        _filter: Option<&VectorStoreFilter>,
    ) -> Result<Vec<Chunk>> {
        Ok(Vec::new())
    }

    async fn get_documents(&self, _ids: &[String]) -> Result<Vec<Chunk>> {
        Ok(Vec::new())
    }
}
