//! Black-box tests of `StoreService` against an in-memory vector store,
//! covering the ingest/search/delete invariants and the unsupported-format
//! scenario from §8, without going through a real vector/blob backend.

use std::sync::Mutex;

use async_trait::async_trait;

use doc_engine_core::chunk::{Chunk, VectorStoreFilter};
use doc_engine_core::embedder::NoOpEmbedder;
use doc_engine_core::error::Result;
use doc_engine_core::vector_store::VectorStore;
use doc_engine_core::{Error, IsolationHarness, ProviderRegistry, SourceFile, StoreService};

/// A minimal in-process `VectorStore`, standing in for pgvector/managed
/// search so these tests don't need either backend running.
#[derive(Default)]
struct InMemoryVectorStore {
    chunks: Mutex<Vec<Chunk>>,
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_documents(&self, chunks: &[Chunk]) -> Result<()> {
        self.chunks.lock().unwrap().extend(chunks.iter().cloned());
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<()> {
        self.chunks
            .lock()
            .unwrap()
            .retain(|c| c.metadata.doc_id.as_deref() != Some(doc_id));
        Ok(())
    }

    async fn similarity_search(
        &self,
        _query_embedding: &[f32],
        k: usize,
        filter: Option<&VectorStoreFilter>,
    ) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.lock().unwrap();
        Ok(chunks
            .iter()
            .filter(|c| {
                filter
                    .map(|f| f.matches(c.metadata.bucket.as_deref(), c.metadata.doc_id.as_deref()))
                    .unwrap_or(true)
            })
            .take(k)
            .cloned()
            .collect())
    }

    async fn get_documents(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.lock().unwrap();
        Ok(chunks.iter().filter(|c| ids.contains(&c.id)).cloned().collect())
    }
}

fn service() -> StoreService {
    StoreService::new(
        ProviderRegistry::new(),
        std::sync::Arc::new(InMemoryVectorStore::default()),
        None,
        std::sync::Arc::new(NoOpEmbedder::new(8)),
        IsolationHarness::new(doc_engine_core::DEFAULT_FILESIZE_THRESHOLD),
        0,
    )
}

async fn plain_text_file(content: &[u8], file_name: &str) -> doc_engine_core::source_file::TempFileGuard {
    doc_engine_core::source_file::temp_file(content, None, Some("text/plain"), Some(file_name))
        .await
        .unwrap()
}

#[tokio::test]
async fn ingest_then_search_finds_the_document_by_doc_id() {
    let service = service();
    let guard = plain_text_file(b"the quick brown fox", "fox.txt").await;
    let file = SourceFile::new("doc-1", guard.path(), "text/plain", "fox.txt", false);

    let format = service.add_file(file, "bucket-a", "doc-1", None, None).await.unwrap();
    assert_eq!(format, "plain");

    let results = service
        .search("fox", Some("bucket-a"), 10, Some(vec!["doc-1".to_string()]))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].content.contains("quick brown fox"));
}

#[tokio::test]
async fn delete_file_removes_all_its_chunks() {
    let service = service();
    let guard = plain_text_file(b"ephemeral content", "note.txt").await;
    let file = SourceFile::new("doc-2", guard.path(), "text/plain", "note.txt", false);
    service.add_file(file, "bucket-a", "doc-2", None, None).await.unwrap();

    service.delete_file("doc-2").await.unwrap();

    let results = service
        .search("ephemeral", None, 10, Some(vec!["doc-2".to_string()]))
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn source_scores_decrease_monotonically_by_position() {
    let service = service();
    for (i, text) in ["alpha", "beta", "gamma"].iter().enumerate() {
        let guard = plain_text_file(text.as_bytes(), "f.txt").await;
        let file = SourceFile::new(format!("doc-score-{i}"), guard.path(), "text/plain", "f.txt", false);
        service
            .add_file(file, "bucket-b", &format!("doc-score-{i}"), None, None)
            .await
            .unwrap();
    }

    let results = service.search("alpha beta gamma", Some("bucket-b"), 3, None).await.unwrap();
    let sources = service.get_file_sources(&results).await.unwrap();

    let n = sources.len() as f64;
    for (i, source) in sources.iter().enumerate() {
        assert_eq!(source.chunk.score, n - i as f64);
    }
}

#[tokio::test]
async fn add_file_rejects_an_unknown_extension() {
    let service = service();
    let guard = plain_text_file(b"???", "x.unknownext").await;
    let file = SourceFile::new("doc-x", guard.path(), "application/octet-stream", "x.unknownext", false);

    let err = service.add_file(file, "bucket-a", "doc-x", None, None).await.unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}
