//! The `pdf` provider: tolerant text extraction with a fallback parser,
//! 1-based page numbers, and a pass-through PDF conversion (the source is
//! already a PDF).

use async_trait::async_trait;

use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::source_file::{fresh_temp_path, SourceFile};

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct PdfProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl PdfProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }

    /// Extracts page texts with the primary parser, falling back to a
    /// second, more tolerant one on failure — mirroring the
    /// PDFMiner-then-PyPDF fallback of the teacher source.
    fn extract_pages(bytes: &[u8]) -> Result<(Vec<String>, &'static str)> {
        match pdf_extract::extract_text_by_pages(bytes) {
            Ok(pages) => Ok((pages, "pdf-extract")),
            Err(primary_err) => {
                tracing::warn!(error = %primary_err, "pdf-extract failed, falling back to lopdf");
                let doc = lopdf::Document::load_mem(bytes)
                    .map_err(|e| Error::processing(400, format!("failed to parse pdf: {e}")))?;
                let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
                let mut pages = Vec::with_capacity(page_numbers.len());
                for page_number in page_numbers {
                    let text = doc
                        .extract_text(&[page_number])
                        .unwrap_or_default();
                    pages.push(text);
                }
                Ok((pages, "lopdf"))
            }
        }
    }
}

impl Default for PdfProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for PdfProvider {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".pdf"]
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
        let bytes = file.buffer().await?;
        let (pages, parser_info) = Self::extract_pages(&bytes)?;

        let chunks: Vec<Chunk> = pages
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                Chunk::new(text)
                    .with_page((index + 1) as u32)
                    .with_extra("pdf_parser", parser_info)
            })
            .collect();

        let splitter = self.splitter(chunk_size, chunk_overlap)?;
        Ok(splitter.split_chunks(chunks))
    }

    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile> {
        let path = fresh_temp_path(Some("pdf"))?;
        let bytes = file.buffer().await?;
        tokio::fs::write(&path, &bytes).await?;
        Ok(SourceFile::new(
            file.id(),
            path,
            "application/pdf",
            file.file_name(),
            false,
        ))
    }

    fn multiprocessable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_garbage_bytes() {
        let guard = crate::source_file::temp_file(b"not a pdf", Some("pdf"), None, Some("x.pdf"))
            .await
            .unwrap();
        let provider = PdfProvider::default();
        let result = provider.process_file(&guard, None, None).await;
        assert!(result.is_err());
    }
}
