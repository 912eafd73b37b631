//! [`Chunk`], its metadata, the vector-store filter, and the Source DTO
//! assembled for search responses (§3).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Required and optional metadata carried by every chunk. The required keys
/// named in §3 (`format`, `mime_type`, `doc_id`, `bucket`, `source`) are
/// typed fields; everything else (`sender`, `subject`, `date`, `pdf_parser`,
/// and any provider-specific extras) lives in `extra` as the design notes
/// suggest for a target-language realisation of the source's dynamic bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub format: Option<String>,
    pub mime_type: Option<String>,
    pub doc_id: Option<String>,
    pub bucket: Option<String>,
    pub source: Option<String>,
    /// 1-based page number, for paginated formats.
    pub page: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ChunkMetadata {
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A text fragment plus metadata, as stored in (or retrieved from) the
/// vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Primary id within the vector store.
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Builds a chunk with a fresh id and no metadata set yet; providers emit
    /// chunks in this shape before §4.6 enrichment fills in the required
    /// fields.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: sanitize_text(&content.into()),
            metadata: ChunkMetadata::default(),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.page = Some(page);
        self
    }

    /// Replaces this chunk's metadata wholesale, e.g. when a split-off piece
    /// should carry its parent's metadata (§4.4).
    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata = self.metadata.with_extra(key, value);
        self
    }

    /// Returns a new chunk with the required store-level metadata filled in.
    /// Allocates rather than mutating in place, matching the "effectively
    /// immutable" discipline of §5.
    pub fn enriched(
        mut self,
        format: &str,
        mime_type: &str,
        doc_id: &str,
        bucket: &str,
        source: &str,
    ) -> Self {
        self.metadata.format = Some(format.to_string());
        self.metadata.mime_type = Some(mime_type.to_string());
        self.metadata.doc_id = Some(doc_id.to_string());
        self.metadata.bucket = Some(bucket.to_string());
        self.metadata.source = Some(source.to_string());
        self
    }
}

/// Replaces NUL bytes with U+FFFD; vector backends cannot store NUL (§4.4,
/// invariant 6 in §8).
pub fn sanitize_text(s: &str) -> String {
    if s.contains('\0') {
        s.replace('\0', "\u{FFFD}")
    } else {
        s.to_string()
    }
}

/// Optional filter applied to vector-store reads: matches a record iff every
/// set field agrees (§3).
#[derive(Debug, Clone, Default)]
pub struct VectorStoreFilter {
    pub bucket: Option<String>,
    pub doc_ids: Option<HashSet<String>>,
}

impl VectorStoreFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_doc_ids(mut self, doc_ids: impl IntoIterator<Item = String>) -> Self {
        self.doc_ids = Some(doc_ids.into_iter().collect());
        self
    }

    /// Whether a chunk with the given `bucket`/`doc_id` metadata matches.
    pub fn matches(&self, bucket: Option<&str>, doc_id: Option<&str>) -> bool {
        let bucket_ok = match &self.bucket {
            None => true,
            Some(b) => bucket == Some(b.as_str()),
        };
        let doc_ok = match &self.doc_ids {
            None => true,
            Some(ids) => doc_id.map(|d| ids.contains(d)).unwrap_or(false),
        };
        bucket_ok && doc_ok
    }
}

/// Nested DTO returned by similarity search (§3, §4.7).
#[derive(Debug, Clone, Serialize)]
pub struct SourceChunkDto {
    pub uri: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<u32>>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDocumentDto {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub download_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDto {
    pub title: String,
    pub chunk: SourceChunkDto,
    pub document: SourceDocumentDto,
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_nul() {
        assert_eq!(sanitize_text("a\0b"), "a\u{FFFD}b");
        assert_eq!(sanitize_text("clean"), "clean");
    }

    #[test]
    fn filter_matches_bucket_and_doc_ids() {
        let f = VectorStoreFilter::new()
            .with_bucket("b1")
            .with_doc_ids(["d1".to_string(), "d2".to_string()]);
        assert!(f.matches(Some("b1"), Some("d1")));
        assert!(!f.matches(Some("b2"), Some("d1")));
        assert!(!f.matches(Some("b1"), Some("d3")));
        assert!(!f.matches(Some("b1"), None));
    }

    #[test]
    fn filter_with_nothing_set_matches_everything() {
        let f = VectorStoreFilter::new();
        assert!(f.matches(None, None));
        assert!(f.matches(Some("anything"), Some("anything")));
    }

    #[test]
    fn enrichment_fills_required_fields() {
        let c = Chunk::new("hello").enriched("plain", "text/plain", "doc-1", "bucket-1", "a.txt");
        assert_eq!(c.metadata.doc_id.as_deref(), Some("doc-1"));
        assert_eq!(c.metadata.source.as_deref(), Some("a.txt"));
    }
}
