//! The `ms-word` provider: native paragraph-text extraction for `.docx` via
//! `docx-rs`, conversion to PDF via the shared office subprocess (§4.4).

use async_trait::async_trait;
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};

use super::office::convert_via_soffice;
use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::source_file::SourceFile;

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct MsWordProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl MsWordProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }

    fn extract_text(bytes: &[u8]) -> Result<String> {
        let docx = read_docx(bytes)
            .map_err(|e| Error::processing(400, format!("failed to parse docx: {e}")))?;

        let mut text = String::new();
        for child in &docx.document.children {
            if let DocumentChild::Paragraph(paragraph) = child {
                for run_child in &paragraph.children {
                    if let ParagraphChild::Run(run) = run_child {
                        for rc in &run.children {
                            if let RunChild::Text(t) = rc {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }
        Ok(text)
    }
}

impl Default for MsWordProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for MsWordProvider {
    fn name(&self) -> &'static str {
        "ms-word"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".docx"]
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
        let text = Self::extract_text(&bytes)?;
        let splitter = self.splitter(chunk_size, chunk_overlap)?;
        Ok(splitter.split_chunks(vec![Chunk::new(text)]))
    }

    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile> {
        convert_via_soffice(file).await
    }
}
