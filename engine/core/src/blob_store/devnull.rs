use async_trait::async_trait;

use super::BlobStore;
use crate::error::{Error, Result};
use crate::source_file::SourceFile;

/// Accepts writes and deletes silently; never reports a document as present.
/// Used when no blob store is configured but callers still want a uniform
/// `Arc<dyn BlobStore>` to wire through (§4.2).
#[derive(Debug, Default, Clone, Copy)]
pub struct DevNullBlobStore;

#[async_trait]
impl BlobStore for DevNullBlobStore {
    async fn add_document(&self, _file: &SourceFile) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _doc_id: &str) -> Result<()> {
        Ok(())
    }

    async fn get_document(&self, doc_id: &str) -> Result<SourceFile> {
        Err(Error::NotFound(doc_id.to_string()))
    }

    async fn exists(&self, _doc_id: &str) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn devnull_never_has_documents() {
        let store = DevNullBlobStore;
        assert!(!store.exists("d1").await.unwrap());
        assert!(store.get_document("d1").await.is_err());
        store.delete("d1").await.unwrap();
    }
}
