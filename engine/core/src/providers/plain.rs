//! The `plain` provider: raw text, split directly; PDF conversion wraps it
//! as-is (no fenced code block) before rendering (§4.4). Trivial enough that
//! it is never worth isolating in the process harness.

use async_trait::async_trait;

use super::render::generate_pdf_from_text;
use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::Result;
use crate::source_file::SourceFile;

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct PlainTextProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl PlainTextProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }
}

impl Default for PlainTextProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for PlainTextProvider {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".txt"]
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
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let splitter = self.splitter(chunk_size, chunk_overlap)?;
        Ok(splitter.split_chunks(vec![Chunk::new(text)]))
    }

    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile> {
        let bytes = file.buffer().await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        generate_pdf_from_text(&text, Some("plain"), file.id(), file.file_name()).await
    }

    fn multiprocessable(&self) -> bool {
        false
    }
}
