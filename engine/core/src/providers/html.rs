//! The `html` provider: plain text extraction via `scraper`, and PDF
//! conversion via the shared external HTML-to-PDF renderer.

use async_trait::async_trait;

use super::render::render_html_to_pdf;
use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::Result;
use crate::source_file::SourceFile;

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct HtmlProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl HtmlProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }
}

impl Default for HtmlProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for HtmlProvider {
    fn name(&self) -> &'static str {
        "html"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".html", ".htm"]
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
        let html_text = String::from_utf8_lossy(&bytes).into_owned();
        let document = scraper::Html::parse_document(&html_text);
        let text: String = document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");

        let splitter = self.splitter(chunk_size, chunk_overlap)?;
        Ok(splitter.split_chunks(vec![Chunk::new(text)]))
    }

    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile> {
        let bytes = file.buffer().await?;
        let html_text = String::from_utf8_lossy(&bytes).into_owned();
        render_html_to_pdf(&html_text, file.id(), file.file_name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_text_from_markup() {
        let guard = crate::source_file::temp_file(
            b"<html><body><h1>Hello</h1><p>World</p></body></html>",
            Some("html"),
            None,
            Some("a.html"),
        )
        .await
        .unwrap();
        let provider = HtmlProvider::default();
        let chunks = provider.process_file(&guard, None, None).await.unwrap();
        assert!(chunks[0].content.contains("Hello"));
        assert!(chunks[0].content.contains("World"));
    }
}
