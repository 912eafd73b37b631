//! Blob store adapter (§4.2): uniform CRUD over opaque document ids, with
//! filesystem, object-store, and dev-null variants.

mod devnull;
mod filesystem;
mod object_store;

pub use devnull::DevNullBlobStore;
pub use filesystem::FilesystemBlobStore;
pub use object_store::{ObjectStoreBlobStore, ObjectStoreConfig};

use async_trait::async_trait;

use crate::error::Result;
use crate::source_file::SourceFile;

/// Common contract implemented by every blob store variant. The engine never
/// depends on a variant beyond this trait.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `file`'s bytes under key `file.id()`. Overwriting an existing
    /// key is permitted (idempotent).
    async fn add_document(&self, file: &SourceFile) -> Result<()>;

    /// Removes the object keyed by `doc_id`. Fails with `Error::NotFound` if
    /// absent.
    async fn delete(&self, doc_id: &str) -> Result<()>;

    /// Returns a `SourceFile` whose bytes are the stored object. Fails with
    /// `Error::NotFound` if absent. The returned file may be a freshly
    /// materialised temporary on disk — treat its lifetime as bounded and
    /// delete it once you are done with it.
    async fn get_document(&self, doc_id: &str) -> Result<SourceFile>;

    /// Whether an object is stored under `doc_id`.
    async fn exists(&self, doc_id: &str) -> Result<bool>;
}
