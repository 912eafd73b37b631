//! The `structured` provider: `.json`, `.xml`, `.yaml`/`.yml` files, split as
//! text and rendered via a fenced code block tagged with the file's own
//! extension (§4.4 table row "json/xml/yaml").

use async_trait::async_trait;

use super::render::generate_pdf_from_text;
use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::Result;
use crate::source_file::SourceFile;

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct StructuredTextProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl StructuredTextProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }

    fn fence_language(ext: &str) -> String {
        match ext.to_ascii_lowercase().as_str() {
            "yml" => "yaml".to_string(),
            other => other.to_string(),
        }
    }
}

impl Default for StructuredTextProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for StructuredTextProvider {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".json", ".xml", ".yaml", ".yml"]
    }

    fn splitter(
        &self,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<RecursiveCharacterTextSplitter> {
        let size = validate_chunk_size(chunk_size, self.default_chunk_size)?;
        let overlap = validate_chunk_overlap(chunk_overlap, self.default_chunk_overlap)?;
        let separators = vec![
            "\n\n".to_string(),
            "\n".to_string(),
            ", ".to_string(),
            " ".to_string(),
            "".to_string(),
        ];
        Ok(RecursiveCharacterTextSplitter::new(size, overlap).with_separators(separators))
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
        let lang = Self::fence_language(file.ext());
        generate_pdf_from_text(&text, Some(&lang), file.id(), file.file_name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn small_chunk_size_splits_json_on_structure_then_content_survives() {
        let content =
            br#"{"ducks":[{"name":"Dagobert Duck","age":80}], "additional_info":{"creator":"Walt Disney"}}"#;
        let guard = crate::source_file::temp_file(content, Some("json"), None, Some("birthdays.json"))
            .await
            .unwrap();

        let provider = StructuredTextProvider::default();
        let chunks = provider.process_file(&guard, Some(50), Some(0)).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, r#"{"ducks":[{"name":"Dagobert Duck","age":80}]"#);
        assert_eq!(chunks[1].content, r#""additional_info":{"creator":"Walt Disney"}}"#);
    }
}
