//! Shared headless-office conversion (§4.4): every office-suite provider
//! (LibreOffice native formats, `.docx`, `.xlsx`, `.pptx`) converts to PDF by
//! shelling out to `soffice` with a fresh per-call profile and output
//! directory, both scoped under the temp root.

use std::path::Path;

use async_trait::async_trait;

use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{pdf::PdfProvider, Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::source_file::{fresh_temp_dir, SourceFile, TempFileGuard};

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Runs `soffice --headless --convert-to pdf` against `file`, isolating the
/// call in a fresh user-profile directory (always removed) and a fresh
/// output directory (removed via the returned file's `delete_dir` flag).
pub(super) async fn convert_via_soffice(file: &SourceFile) -> Result<SourceFile> {
    let output_dir = fresh_temp_dir().await?;
    let profile_dir = fresh_temp_dir().await?;
    let profile_url = format!("file://{}", profile_dir.display());

    let result = tokio::process::Command::new("soffice")
        .arg("--headless")
        .arg(format!("-env:UserInstallation={profile_url}"))
        .arg("--convert-to")
        .arg("pdf")
        .arg(file.path())
        .arg("--outdir")
        .arg(&output_dir)
        .env("HOME", crate::source_file::temp_root())
        .output()
        .await;

    if let Err(e) = tokio::fs::remove_dir_all(&profile_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %profile_dir.display(), error = %e, "failed to remove office profile directory");
        }
    }

    let output = result?;
    if !output.status.success() {
        let _ = tokio::fs::remove_dir_all(&output_dir).await;
        return Err(Error::Conversion {
            exit_status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stem = Path::new(file.file_name())
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let pdf_path = output_dir.join(format!("{stem}.pdf"));

    Ok(SourceFile::new(
        file.id(),
        pdf_path,
        "application/pdf",
        file.file_name(),
        true,
    ))
}

/// Converts via `soffice`, then parses the resulting PDF with
/// [`PdfProvider`], cleaning up the intermediate PDF when done.
pub(super) async fn process_via_pdf_round_trip(
    file: &SourceFile,
    chunk_size: Option<i64>,
    chunk_overlap: Option<i64>,
) -> Result<Vec<Chunk>> {
    let pdf = convert_via_soffice(file).await?;
    let guard = TempFileGuard::wrap(pdf);
    PdfProvider::default()
        .process_file(&guard, chunk_size, chunk_overlap)
        .await
}

/// Handles the LibreOffice-native document formats (`.odp`, `.ods`, `.odt`)
/// by round-tripping through a PDF rendering and the `pdf` provider (§4.4).
pub struct LibreOfficeProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl LibreOfficeProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }
}

impl Default for LibreOfficeProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for LibreOfficeProvider {
    fn name(&self) -> &'static str {
        "libreoffice"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".odp", ".ods", ".odt"]
    }

    fn splitter(
        &self,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<RecursiveCharacterTextSplitter> {
        let size = validate_chunk_size(chunk_size, self.default_chunk_size)?;
        let overlap = validate_chunk_overlap(chunk_overlap, self.default_chunk_overlap)?;
        Ok(RecursiveCharacterTextSplitter::new(size, overlap))
    }

    async fn process_file(
        &self,
        file: &SourceFile,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<Vec<Chunk>> {
        process_via_pdf_round_trip(file, chunk_size, chunk_overlap).await
    }

    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile> {
        convert_via_soffice(file).await
    }
}
