//! Document ingestion and retrieval engine core: format providers, blob and
//! vector store adapters, the process-isolation harness, and the
//! orchestration service tying them together. The binary crate (`engine/server`)
//! owns HTTP, configuration loading, logging, and metrics; this crate only
//! ever emits `tracing` events, never configures a subscriber.

pub mod blob_store;
pub mod chunk;
pub mod embedder;
pub mod error;
pub mod isolation;
pub mod providers;
pub mod source_file;
pub mod store_service;
pub mod vector_store;

pub use chunk::{Chunk, ChunkMetadata, SourceChunkDto, SourceDocumentDto, SourceDto, VectorStoreFilter};
pub use embedder::Embedder;
pub use error::{Error, Result};
pub use isolation::{IsolationHarness, DEFAULT_FILESIZE_THRESHOLD};
pub use providers::{Provider, ProviderRegistry};
pub use source_file::{SourceFile, TempFileGuard};
pub use store_service::StoreService;
