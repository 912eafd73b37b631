use std::path::{Path, PathBuf};

use async_trait::async_trait;
use path_clean::PathClean;

use super::BlobStore;
use crate::error::{Error, Result};
use crate::source_file::{temp_file, SourceFile, TempFileGuard};

/// Filesystem-backed blob store, rooted at a configured directory. Every key
/// is joined with the root and resolved; anything that would escape the
/// root is rejected with `Error::PathEscape`, the same defence the temp-file
/// scope uses (§4.2).
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Ensures `root` exists (created lazily on startup) and returns a store
    /// rooted there.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into().clean();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn resolve(&self, doc_id: &str) -> Result<PathBuf> {
        let basename = Path::new(doc_id)
            .file_name()
            .ok_or_else(|| Error::PathEscape(format!("invalid document id '{doc_id}'")))?;
        let joined = self.root.join(basename).clean();
        if !joined.starts_with(&self.root) {
            return Err(Error::PathEscape(format!(
                "document id '{doc_id}' escapes blob store root"
            )));
        }
        Ok(joined)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn add_document(&self, file: &SourceFile) -> Result<()> {
        let path = self.resolve(file.id())?;
        let bytes = file.buffer().await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<()> {
        let path = self.resolve(doc_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(doc_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_document(&self, doc_id: &str) -> Result<SourceFile> {
        let path = self.resolve(doc_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(doc_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let guard: TempFileGuard = temp_file(&bytes, None, None, Some(doc_id)).await?;
        Ok(guard.into_inner())
    }

    async fn exists(&self, doc_id: &str) -> Result<bool> {
        let path = self.resolve(doc_id)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_file::SourceFile;

    async fn store() -> (FilesystemBlobStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("fsstore-{}", uuid::Uuid::new_v4()));
        let store = FilesystemBlobStore::new(&dir).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn add_get_delete_round_trip() {
        let (store, dir) = store().await;
        let guard = crate::source_file::temp_file(b"hello", Some("txt"), None, Some("a.txt"))
            .await
            .unwrap();
        let input = SourceFile::new("doc-1", guard.path(), "text/plain", "a.txt", false);

        store.add_document(&input).await.unwrap();
        assert!(store.exists("doc-1").await.unwrap());

        let fetched = store.get_document("doc-1").await.unwrap();
        assert_eq!(fetched.buffer().await.unwrap(), b"hello");
        fetched.delete().await.unwrap();

        store.delete("doc-1").await.unwrap();
        assert!(!store.exists("doc-1").await.unwrap());
        assert!(matches!(
            store.delete("doc-1").await,
            Err(Error::NotFound(_))
        ));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn basenames_any_path_components_out_of_the_id() {
        let (store, dir) = store().await;
        let resolved = store.resolve("../../etc/passwd").unwrap();
        assert_eq!(resolved, store.root.join("passwd"));
        assert!(store.resolve("..").is_err());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
