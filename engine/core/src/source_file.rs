//! [`SourceFile`] — a value object naming an on-disk byte stream — and the
//! scoped temp-file acquisition that guarantees its cleanup.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use path_clean::PathClean;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Root directory under which every temporary [`SourceFile`] artifact is
/// created. Configurable via the `TMP_FILES_ROOT` environment variable,
/// default `/tmp`, resolved once at process start.
static TMP_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("TMP_FILES_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
});

/// The configured temp root.
pub fn temp_root() -> &'static Path {
    TMP_ROOT.as_path()
}

/// Joins `root` and `name`, rejecting any result that would resolve outside
/// `root` once normalised. Mirrors the path-escape guard used by the
/// filesystem blob store (§4.2) and the temp-file scope (§4.1).
fn safe_join(root: &Path, name: &str) -> Result<PathBuf> {
    let joined = root.join(name).clean();
    if !joined.starts_with(root) {
        return Err(Error::PathEscape(format!(
            "'{}' escapes root '{}'",
            name,
            root.display()
        )));
    }
    Ok(joined)
}

/// Normalises a user-supplied extension to include a leading dot, or returns
/// an empty string if none was given.
fn normalise_extension(extension: Option<&str>) -> String {
    match extension {
        None => String::new(),
        Some(ext) if ext.is_empty() => String::new(),
        Some(ext) if ext.starts_with('.') => ext.to_string(),
        Some(ext) => format!(".{ext}"),
    }
}

/// A named on-disk byte stream with identity, MIME type, and filename.
///
/// Ownership of the underlying file belongs to whichever scope holds the
/// `SourceFile`; nothing deletes it automatically on drop — callers that want
/// guaranteed cleanup use [`temp_file`] or wrap the file in a [`TempFileGuard`]
/// explicitly (see §4.1).
#[derive(Debug, Clone)]
pub struct SourceFile {
    id: String,
    path: PathBuf,
    mime_type: String,
    file_name: String,
    delete_dir: bool,
}

impl SourceFile {
    /// Constructs a `SourceFile` with an explicit id.
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
        delete_dir: bool,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            mime_type: mime_type.into(),
            file_name: file_name.into(),
            delete_dir,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn delete_dir(&self) -> bool {
        self.delete_dir
    }

    /// Suffix of `file_name`, with no leading dot. Empty if `file_name` has
    /// no extension.
    pub fn ext(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => "",
        }
    }

    /// Bytes currently on disk at `path`.
    pub async fn size(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    /// Reads the full byte content of the file.
    pub async fn buffer(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Deletes the file and, if `delete_dir` is set, its containing
    /// directory. Idempotent: deleting an already-absent file is not an
    /// error.
    pub async fn delete(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if self.delete_dir {
            if let Some(parent) = self.path.parent() {
                if let Err(e) = tokio::fs::remove_dir_all(parent).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %parent.display(), error = %e, "failed to remove temp directory");
                    }
                }
            }
        }
        Ok(())
    }
}

/// RAII guard around a [`SourceFile`] that deletes it (and its containing
/// directory, if flagged) unconditionally when dropped — the scoped
/// acquisition named in §4.1. Cleanup runs synchronously in `Drop` since Rust
/// has no async destructors; this mirrors how the teacher's request-scoped
/// upload/download sessions guarantee release on every exit path.
pub struct TempFileGuard {
    file: SourceFile,
}

impl TempFileGuard {
    /// Wraps an existing `SourceFile` so it is deleted when the guard drops.
    pub fn wrap(file: SourceFile) -> Self {
        Self { file }
    }

    /// Releases the guard without attempting further cleanup, returning the
    /// inner `SourceFile` to the caller for manual lifetime management.
    pub fn into_inner(self) -> SourceFile {
        let file = self.file.clone();
        std::mem::forget(self);
        file
    }
}

impl Deref for TempFileGuard {
    type Target = SourceFile;

    fn deref(&self) -> &SourceFile {
        &self.file
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.file.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.file.path.display(), error = %e, "failed to remove temp file");
            }
        }
        if self.file.delete_dir {
            if let Some(parent) = self.file.path.parent() {
                if let Err(e) = std::fs::remove_dir_all(parent) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %parent.display(), error = %e, "failed to remove temp directory");
                    }
                }
            }
        }
    }
}

/// Allocates a fresh, collision-free path under the temp root, without
/// creating anything on disk. Used by providers that need to hand a writer
/// (e.g. a PDF renderer) a destination path.
pub fn fresh_temp_path(extension: Option<&str>) -> Result<PathBuf> {
    let name = format!("{}{}", Uuid::new_v4(), normalise_extension(extension));
    safe_join(temp_root(), &name)
}

/// Creates a fresh, empty scratch directory under the temp root (for office
/// subprocess profile/output directories, per §4.4) and returns its path.
pub async fn fresh_temp_dir() -> Result<PathBuf> {
    let name = Uuid::new_v4().to_string();
    let dir = safe_join(temp_root(), &name)?;
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Scoped acquisition of a temporary `SourceFile`: writes `bytes` to a fresh
/// path under the temp root and returns a guard that deletes it on drop,
/// regardless of outcome (§4.1).
pub async fn temp_file(
    bytes: &[u8],
    extension: Option<&str>,
    mime_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<TempFileGuard> {
    let id = Uuid::new_v4().to_string();
    let ext = normalise_extension(extension);
    let disk_name = format!("{id}{ext}");
    let path = safe_join(temp_root(), &disk_name)?;

    tokio::fs::write(&path, bytes).await?;

    let file_name = file_name.map(str::to_string).unwrap_or_else(|| disk_name.clone());
    let mime_type = mime_type.unwrap_or("").to_string();

    Ok(TempFileGuard::wrap(SourceFile::new(id, path, mime_type, file_name, false)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn temp_file_round_trips_bytes_and_cleans_up() {
        let guard = temp_file(b"hello world", Some("txt"), Some("text/plain"), Some("a.txt"))
            .await
            .unwrap();
        assert_eq!(guard.buffer().await.unwrap(), b"hello world");
        assert_eq!(guard.size().await.unwrap(), 11);
        let path = guard.path().to_path_buf();
        drop(guard);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn temp_file_cleans_up_containing_dir_when_flagged() {
        let dir = fresh_temp_dir().await.unwrap();
        let path = dir.join("out.pdf");
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();
        let guard = TempFileGuard::wrap(SourceFile::new(
            "doc-1",
            path.clone(),
            "application/pdf",
            "out.pdf",
            true,
        ));
        drop(guard);
        assert!(!dir.exists());
    }

    #[test]
    fn ext_strips_leading_components_only() {
        let f = SourceFile::new("1", "/tmp/x", "", "birthdays.tar.gz", false);
        assert_eq!(f.ext(), "gz");
        let f = SourceFile::new("1", "/tmp/x", "", "noext", false);
        assert_eq!(f.ext(), "");
    }

    #[test]
    fn safe_join_rejects_escape() {
        let root = Path::new("/tmp/engine-root");
        assert!(safe_join(root, "../../etc/passwd").is_err());
        assert!(safe_join(root, "ok.txt").is_ok());
    }
}
