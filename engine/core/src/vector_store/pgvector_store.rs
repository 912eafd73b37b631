use std::sync::Arc;

use async_trait::async_trait;
use pgvector::Vector;
use tokio_postgres::{Client, NoTls};

use super::VectorStore;
use crate::chunk::{Chunk, ChunkMetadata, VectorStoreFilter};
use crate::embedder::Embedder;
use crate::error::{Error, Result};

/// Relational-vector store backed by PostgreSQL + the `pgvector` extension.
/// Chunk metadata is persisted as a JSON string column (extra keys included)
/// rather than a typed table, matching the dynamic-bag design of §3. Content
/// embeddings are computed here, at write time, via the configured embedder.
pub struct PgVectorStore {
    client: Client,
    embedder: Arc<dyn Embedder>,
    dims: usize,
}

impl PgVectorStore {
    /// Connects to `conn_str`, ensures the schema exists for embeddings of
    /// dimension `dims`, and returns a ready store.
    pub async fn new(conn_str: &str, dims: usize, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(conn_str, NoTls)
            .await
            .map_err(|e| Error::Store(format!("failed to connect to pgvector: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "pgvector connection terminated");
            }
        });

        let store = Self {
            client,
            embedder,
            dims,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client
            .batch_execute("CREATE EXTENSION IF NOT EXISTS vector")
            .await
            .map_err(|e| Error::Store(format!("failed to enable pgvector extension: {e}")))?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                doc_id TEXT NOT NULL,
                bucket TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding vector({dims})
            );
            CREATE INDEX IF NOT EXISTS chunks_doc_id_idx ON chunks (doc_id);
            CREATE INDEX IF NOT EXISTS chunks_bucket_idx ON chunks (bucket);"
        );
        self.client
            .batch_execute(&ddl)
            .await
            .map_err(|e| Error::Store(format!("failed to create chunks schema: {e}")))?;
        Ok(())
    }

    fn row_to_chunk(row: &tokio_postgres::Row) -> Result<Chunk> {
        let metadata_json: String = row.get("metadata");
        let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
            .map_err(|e| Error::Store(format!("corrupt chunk metadata: {e}")))?;
        Ok(Chunk {
            id: row.get("id"),
            content: row.get("content"),
            metadata,
        })
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn add_documents(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut txn = self
            .client
            .transaction()
            .await
            .map_err(|e| Error::Store(format!("failed to start transaction: {e}")))?;

        for chunk in chunks {
            let doc_id = chunk.metadata.doc_id.clone().unwrap_or_default();
            let bucket = chunk.metadata.bucket.clone().unwrap_or_default();
            let metadata_json = serde_json::to_string(&chunk.metadata)
                .map_err(|e| Error::Store(format!("failed to encode metadata: {e}")))?;
            let vector = self.embedder.embed(&chunk.content).await?;
            let embedding = Vector::from(vector);

            let stmt = txn
                .prepare(
                    "INSERT INTO chunks (id, doc_id, bucket, content, metadata, embedding)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (id) DO UPDATE SET
                        doc_id = EXCLUDED.doc_id,
                        bucket = EXCLUDED.bucket,
                        content = EXCLUDED.content,
                        metadata = EXCLUDED.metadata,
                        embedding = EXCLUDED.embedding",
                )
                .await
                .map_err(|e| Error::Store(format!("failed to prepare insert: {e}")))?;

            txn.execute(
                &stmt,
                &[
                    &chunk.id,
                    &doc_id,
                    &bucket,
                    &chunk.content,
                    &metadata_json,
                    &embedding,
                ],
            )
            .await
            .map_err(|e| Error::Store(format!("batch insert failed, retry whole batch: {e}")))?;
        }

        txn.commit()
            .await
            .map_err(|e| Error::Store(format!("failed to commit batch: {e}")))?;
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<()> {
        self.client
            .execute("DELETE FROM chunks WHERE doc_id = $1", &[&doc_id])
            .await
            .map_err(|e| Error::Store(format!("delete failed: {e}")))?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&VectorStoreFilter>,
    ) -> Result<Vec<Chunk>> {
        let bucket = filter.and_then(|f| f.bucket.clone());
        let doc_ids: Option<Vec<String>> = filter
            .and_then(|f| f.doc_ids.as_ref())
            .map(|ids| ids.iter().cloned().collect());
        let embedding = Vector::from(query_embedding.to_vec());

        let rows = self
            .client
            .query(
                "SELECT id, doc_id, bucket, content, metadata
                 FROM chunks
                 WHERE ($1::text IS NULL OR bucket = $1)
                   AND ($2::text[] IS NULL OR doc_id = ANY($2))
                 ORDER BY embedding <-> $3
                 LIMIT $4",
                &[&bucket, &doc_ids, &embedding, &(k as i64)],
            )
            .await
            .map_err(|e| Error::Store(format!("similarity_search failed: {e}")))?;

        rows.iter().map(Self::row_to_chunk).collect()
    }

    async fn get_documents(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .client
            .query(
                "SELECT id, doc_id, bucket, content, metadata FROM chunks WHERE id = ANY($1)",
                &[&ids],
            )
            .await
            .map_err(|e| Error::Store(format!("get_documents failed: {e}")))?;

        rows.iter().map(Self::row_to_chunk).collect()
    }
}
