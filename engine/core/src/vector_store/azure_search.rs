use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::VectorStore;
use crate::chunk::{Chunk, ChunkMetadata, VectorStoreFilter};
use crate::embedder::Embedder;
use crate::error::{Error, Result};

/// Escapes a string for embedding as an OData literal: the convention is
/// doubling any embedded single quote, the filter string's delimiter.
fn escape_odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Connection details for a managed-search backend (Azure AI Search or a
/// compatible REST vector index).
#[derive(Debug, Clone)]
pub struct AzureSearchConfig {
    pub endpoint: String,
    pub index_name: String,
    pub api_key: String,
    pub api_version: String,
    pub vector_field: String,
}

impl AzureSearchConfig {
    pub fn new(endpoint: impl Into<String>, index_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            index_name: index_name.into(),
            api_key: api_key.into(),
            api_version: "2023-11-01".to_string(),
            vector_field: "embedding".to_string(),
        }
    }
}

/// Managed-search vector store variant: writes/reads go over REST rather
/// than a driver, matching the "managed-search" store type named in §6.
pub struct AzureSearchStore {
    client: reqwest::Client,
    config: AzureSearchConfig,
    embedder: Arc<dyn Embedder>,
}

#[derive(Serialize)]
struct IndexDoc {
    #[serde(rename = "@search.action")]
    action: &'static str,
    id: String,
    content: String,
    metadata: String,
    doc_id: String,
    bucket: String,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct SearchResponse {
    value: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: String,
    content: String,
    metadata: String,
}

#[derive(Deserialize)]
struct LookupDoc {
    id: String,
    content: String,
    metadata: String,
}

impl AzureSearchStore {
    pub fn new(config: AzureSearchConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            embedder,
        }
    }

    fn docs_url(&self, suffix: &str) -> String {
        format!(
            "{}/indexes/{}/docs{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.index_name,
            suffix,
            self.config.api_version
        )
    }

    fn chunk_from_parts(id: String, content: String, metadata_json: &str) -> Result<Chunk> {
        let metadata: ChunkMetadata = serde_json::from_str(metadata_json)
            .map_err(|e| Error::Store(format!("corrupt chunk metadata: {e}")))?;
        Ok(Chunk {
            id,
            content,
            metadata,
        })
    }

    async fn check(resp: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(Error::Store(format!(
                "{action} failed ({status}): {body}"
            )))
        }
    }
}

#[async_trait]
impl VectorStore for AzureSearchStore {
    async fn add_documents(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut docs = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = self.embedder.embed(&chunk.content).await?;
            let metadata_json = serde_json::to_string(&chunk.metadata)
                .map_err(|e| Error::Store(format!("failed to encode metadata: {e}")))?;
            docs.push(IndexDoc {
                action: "mergeOrUpload",
                id: chunk.id.clone(),
                content: chunk.content.clone(),
                metadata: metadata_json,
                doc_id: chunk.metadata.doc_id.clone().unwrap_or_default(),
                bucket: chunk.metadata.bucket.clone().unwrap_or_default(),
                embedding,
            });
        }

        let resp = self
            .client
            .post(self.docs_url("/index"))
            .header("api-key", &self.config.api_key)
            .json(&json!({ "value": docs }))
            .send()
            .await
            .map_err(|e| Error::Store(format!("index upload failed, retry whole batch: {e}")))?;
        Self::check(resp, "add_documents").await?;
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<()> {
        let doc_id = escape_odata_literal(doc_id);
        let resp = self
            .client
            .post(self.docs_url("/search"))
            .header("api-key", &self.config.api_key)
            .json(&json!({ "search": "*", "filter": format!("doc_id eq '{doc_id}'"), "select": "id" }))
            .send()
            .await
            .map_err(|e| Error::Store(format!("delete lookup failed: {e}")))?;
        let resp = Self::check(resp, "delete lookup").await?;
        let found: SearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to decode search response: {e}")))?;
        if found.value.is_empty() {
            return Ok(());
        }

        let docs: Vec<_> = found
            .value
            .into_iter()
            .map(|hit| json!({ "@search.action": "delete", "id": hit.id }))
            .collect();
        let resp = self
            .client
            .post(self.docs_url("/index"))
            .header("api-key", &self.config.api_key)
            .json(&json!({ "value": docs }))
            .send()
            .await
            .map_err(|e| Error::Store(format!("delete failed: {e}")))?;
        Self::check(resp, "delete").await?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&VectorStoreFilter>,
    ) -> Result<Vec<Chunk>> {
        let mut filter_clauses = Vec::new();
        if let Some(bucket) = filter.and_then(|f| f.bucket.as_deref()) {
            let bucket = escape_odata_literal(bucket);
            filter_clauses.push(format!("bucket eq '{bucket}'"));
        }
        if let Some(ids) = filter.and_then(|f| f.doc_ids.as_ref()) {
            let ors: Vec<String> = ids
                .iter()
                .map(|id| format!("doc_id eq '{}'", escape_odata_literal(id)))
                .collect();
            if !ors.is_empty() {
                filter_clauses.push(format!("({})", ors.join(" or ")));
            }
        }
        let odata_filter = (!filter_clauses.is_empty()).then(|| filter_clauses.join(" and "));

        let body = json!({
            "count": false,
            "top": k,
            "filter": odata_filter,
            "vectorQueries": [{
                "kind": "vector",
                "vector": query_embedding,
                "fields": self.config.vector_field,
                "k": k,
            }],
        });

        let resp = self
            .client
            .post(self.docs_url("/search"))
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Store(format!("similarity_search failed: {e}")))?;
        let resp = Self::check(resp, "similarity_search").await?;
        let decoded: SearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Store(format!("failed to decode search response: {e}")))?;

        decoded
            .value
            .into_iter()
            .map(|hit| Self::chunk_from_parts(hit.id, hit.content, &hit.metadata))
            .collect()
    }

    async fn get_documents(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let resp = self
                .client
                .get(self.docs_url(&format!("/{id}")))
                .header("api-key", &self.config.api_key)
                .send()
                .await
                .map_err(|e| Error::Store(format!("get_documents failed: {e}")))?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                continue;
            }
            let resp = Self::check(resp, "get_documents").await?;
            let doc: LookupDoc = resp
                .json()
                .await
                .map_err(|e| Error::Store(format!("failed to decode document: {e}")))?;
            out.push(Self::chunk_from_parts(doc.id, doc.content, &doc.metadata)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_odata_literal_doubles_embedded_quotes() {
        assert_eq!(escape_odata_literal("plain"), "plain");
        assert_eq!(escape_odata_literal("O'Brien"), "O''Brien");
        assert_eq!(
            escape_odata_literal("a' or doc_id eq 'b"),
            "a'' or doc_id eq ''b"
        );
    }
}
