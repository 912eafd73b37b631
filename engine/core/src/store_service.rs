//! Orchestration over providers, the vector store, and the optional blob
//! store: add-file, search, retrieval and deletion (§4.6, §4.7), grounded
//! directly in the original `store_service.py`.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::chunk::{Chunk, SourceChunkDto, SourceDocumentDto, SourceDto, VectorStoreFilter};
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::isolation::IsolationHarness;
use crate::providers::ProviderRegistry;
use crate::source_file::{SourceFile, TempFileGuard};
use crate::vector_store::VectorStore;

use crate::blob_store::BlobStore;

pub struct StoreService {
    providers: ProviderRegistry,
    vector_store: Arc<dyn VectorStore>,
    blob_store: Option<Arc<dyn BlobStore>>,
    embedder: Arc<dyn Embedder>,
    isolation: IsolationHarness,
    batch_size: usize,
}

impl StoreService {
    pub fn new(
        providers: ProviderRegistry,
        vector_store: Arc<dyn VectorStore>,
        blob_store: Option<Arc<dyn BlobStore>>,
        embedder: Arc<dyn Embedder>,
        isolation: IsolationHarness,
        batch_size: usize,
    ) -> Self {
        Self {
            providers,
            vector_store,
            blob_store,
            embedder,
            isolation,
            batch_size,
        }
    }

    /// §4.6: select a provider, parse (via blob-store PDF round-trip when
    /// configured, else the original file directly), enrich, batch, and add
    /// to the vector store. Returns the dispatched provider's name, so
    /// callers can label per-format metrics.
    pub async fn add_file(
        &self,
        file: SourceFile,
        bucket: &str,
        doc_id: &str,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<&'static str> {
        let provider = self
            .providers
            .find(&file)
            .ok_or_else(|| Error::Unsupported(file.file_name().to_string()))?;

        tracing::info!(doc_id, format = provider.name(), "start adding file");

        let chunks = if let Some(blob_store) = &self.blob_store {
            let pdf = self
                .isolation
                .convert_file_to_pdf(provider.clone(), file.clone())
                .await?;
            let pdf_guard = TempFileGuard::wrap(pdf);

            tracing::info!(doc_id, "converted file to pdf");

            let pdf_provider = self
                .providers
                .by_name("pdf")
                .expect("pdf provider is always registered");
            let chunks = self
                .isolation
                .process_file(pdf_provider, (*pdf_guard).clone(), chunk_size, chunk_overlap)
                .await?;

            tracing::info!(doc_id, chunks = chunks.len(), "chunked pdf version of file");

            blob_store.add_document(&pdf_guard).await?;
            tracing::info!(doc_id, "saved pdf for file");

            chunks
        } else {
            let chunks = self
                .isolation
                .process_file(provider.clone(), file.clone(), chunk_size, chunk_overlap)
                .await?;
            tracing::info!(doc_id, chunks = chunks.len(), "chunked file");
            chunks
        };

        let batch_size = if self.batch_size == 0 {
            chunks.len().max(1)
        } else {
            self.batch_size
        };
        let num_batches = chunks.len().div_ceil(batch_size).max(1);

        for (index, batch) in chunks.chunks(batch_size).enumerate() {
            let enriched: Vec<Chunk> = batch
                .iter()
                .cloned()
                .map(|c| c.enriched(provider.name(), file.mime_type(), doc_id, bucket, file.file_name()))
                .collect();

            tracing::info!(
                doc_id,
                batch = index + 1,
                num_batches,
                chunks = enriched.len(),
                "adding batch"
            );
            self.vector_store.add_documents(&enriched).await?;
        }

        Ok(provider.name())
    }

    /// §4.7 step 1-3: filtered similarity search, with per-format clean-up
    /// and the `bucket` key stripped before returning.
    pub async fn search(
        &self,
        query: &str,
        bucket: Option<&str>,
        take: usize,
        doc_ids: Option<Vec<String>>,
    ) -> Result<Vec<Chunk>> {
        let mut filter = VectorStoreFilter::new();
        if let Some(bucket) = bucket {
            filter = filter.with_bucket(bucket);
        }
        if let Some(doc_ids) = doc_ids {
            filter = filter.with_doc_ids(doc_ids);
        }

        tracing::info!("start similarity search");
        let query_embedding = self.embedder.embed(query).await?;
        let chunks = self
            .vector_store
            .similarity_search(&query_embedding, take, Some(&filter))
            .await?;

        let cleaned = chunks
            .into_iter()
            .map(|chunk| {
                let mut chunk = match chunk.metadata.format.as_deref().and_then(|f| self.providers.by_name(f)) {
                    Some(provider) => provider.clean_up(chunk),
                    None => chunk,
                };
                chunk.metadata.bucket = None;
                chunk
            })
            .collect();

        Ok(cleaned)
    }

    /// §4.7: fetch chunks by id, sorting ascending by `page` when the first
    /// result's format is `pdf` (chunks without a page sort last).
    pub async fn get_documents_content(&self, ids: &[String]) -> Result<Vec<String>> {
        let mut chunks = self.vector_store.get_documents(ids).await?;

        if chunks.first().and_then(|c| c.metadata.format.as_deref()) == Some("pdf") {
            chunks.sort_by_key(|c| c.metadata.page.unwrap_or(u32::MAX));
        }

        Ok(chunks.into_iter().map(|c| c.content).collect())
    }

    /// §4.7: the blob-store entry if a blob store is configured, else none.
    pub async fn get_document_pdf(&self, doc_id: &str) -> Result<Option<SourceFile>> {
        match &self.blob_store {
            None => Ok(None),
            Some(blob_store) => Ok(Some(blob_store.get_document(doc_id).await?)),
        }
    }

    /// §4.7: delete all chunks tagged with `doc_id`, and the PDF if a blob
    /// store is configured.
    pub async fn delete_file(&self, doc_id: &str) -> Result<()> {
        tracing::info!(doc_id, "delete chunks");
        self.vector_store.delete(doc_id).await?;

        if let Some(blob_store) = &self.blob_store {
            tracing::info!(doc_id, "delete pdf");
            blob_store.delete(doc_id).await?;
        }

        Ok(())
    }

    /// §4.7 final paragraph: assembles Source DTOs with a monotonically
    /// decreasing score and a batched `exists` lookup for
    /// `download_available` (not per-chunk).
    pub async fn get_file_sources(&self, results: &[Chunk]) -> Result<Vec<SourceDto>> {
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let length = results.len();

        let exists: BTreeMap<String, bool> = match &self.blob_store {
            None => BTreeMap::new(),
            Some(blob_store) => {
                let doc_ids: Vec<String> = results
                    .iter()
                    .filter_map(|c| c.metadata.doc_id.clone())
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect();

                let checks = join_all(doc_ids.iter().map(|id| {
                    let blob_store = blob_store.clone();
                    let id = id.clone();
                    async move { (id.clone(), blob_store.exists(&id).await.unwrap_or(false)) }
                }))
                .await;

                checks.into_iter().collect()
            }
        };

        Ok(results
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let doc_id = chunk.metadata.doc_id.clone().unwrap_or_default();
                let source = chunk.metadata.source.clone().unwrap_or_else(|| "Unknown".to_string());

                SourceDto {
                    title: source.clone(),
                    chunk: SourceChunkDto {
                        uri: chunk.id.clone(),
                        content: chunk.content.clone(),
                        pages: chunk.metadata.page.map(|p| vec![p]),
                        score: (length - i) as f64,
                    },
                    document: SourceDocumentDto {
                        uri: doc_id.clone(),
                        name: source,
                        mime_type: chunk.metadata.mime_type.clone().unwrap_or_default(),
                        link: None,
                        download_available: exists.get(&doc_id).copied().unwrap_or(false),
                    },
                    metadata: metadata_map(&chunk.metadata),
                }
            })
            .collect())
    }
}

/// Flattens a chunk's metadata for the DTO's free-form `metadata` map,
/// excluding `page` and `doc_id` (carried in dedicated DTO fields already).
fn metadata_map(metadata: &crate::chunk::ChunkMetadata) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(v) = &metadata.format {
        map.insert("format".to_string(), v.clone());
    }
    if let Some(v) = &metadata.mime_type {
        map.insert("mime_type".to_string(), v.clone());
    }
    if let Some(v) = &metadata.source {
        map.insert("source".to_string(), v.clone());
    }
    for (k, v) in &metadata.extra {
        map.insert(k.clone(), v.clone());
    }
    map
}
