//! The `ms-ppt` provider: one chunk per slide, pages numbered in slide order
//! (§4.4). `.pptx` is a zip archive of per-slide XML parts; we read those
//! parts directly rather than pulling in a dedicated presentation crate.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use zip::ZipArchive;

use super::office::convert_via_soffice;
use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::source_file::SourceFile;

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct MsPptProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl MsPptProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }

    /// Returns slide entry names (`ppt/slides/slideN.xml`) sorted by `N`,
    /// rather than by archive order.
    fn slide_entries(archive: &ZipArchive<Cursor<Vec<u8>>>) -> Vec<(u32, String)> {
        let mut slides = Vec::new();
        for name in archive.file_names() {
            if let Some(rest) = name
                .strip_prefix("ppt/slides/slide")
                .and_then(|r| r.strip_suffix(".xml"))
            {
                if let Ok(n) = rest.parse::<u32>() {
                    slides.push((n, name.to_string()));
                }
            }
        }
        slides.sort_by_key(|(n, _)| *n);
        slides
    }

    /// Extracts the text of every `<a:t>` run in a slide's XML part.
    fn extract_slide_text(xml: &str) -> Result<String> {
        let mut reader = XmlReader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut in_text_run = false;
        let mut text = String::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
                Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => {
                    in_text_run = false;
                    text.push(' ');
                }
                Ok(Event::Text(e)) if in_text_run => {
                    text.push_str(
                        &e.unescape()
                            .map_err(|e| Error::processing(400, format!("bad slide xml: {e}")))?,
                    );
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::processing(400, format!("bad slide xml: {e}"))),
                _ => {}
            }
            buf.clear();
        }
        Ok(text.trim().to_string())
    }
}

impl Default for MsPptProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for MsPptProvider {
    fn name(&self) -> &'static str {
        "ms-ppt"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".pptx"]
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
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::processing(400, format!("failed to open pptx: {e}")))?;

        let slides = Self::slide_entries(&archive);
        let splitter = self.splitter(chunk_size, chunk_overlap)?;
        let mut chunks = Vec::with_capacity(slides.len());

        for (page, entry_name) in slides {
            let mut xml = String::new();
            archive
                .by_name(&entry_name)
                .map_err(|e| Error::processing(400, format!("missing slide entry: {e}")))?
                .read_to_string(&mut xml)
                .map_err(|e| Error::processing(400, format!("failed to read slide: {e}")))?;

            let text = Self::extract_slide_text(&xml)?;
            let chunk = Chunk::new(text).with_page(page);
            chunks.extend(splitter.split_chunks(vec![chunk]));
        }

        Ok(chunks)
    }

    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile> {
        convert_via_soffice(file).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    use super::*;

    fn build_pptx(slides: &[&str]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buf);
        let options = FileOptions::default();

        for (i, text) in slides.iter().enumerate() {
            let name = format!("ppt/slides/slide{}.xml", i + 1);
            zip.start_file(name, options).unwrap();
            let xml = format!(
                "<p:sld xmlns:a=\"a\"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"
            );
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn one_chunk_per_slide_numbered_in_order() {
        let bytes = build_pptx(&["Welcome", "Agenda"]);
        let guard = crate::source_file::temp_file(&bytes, Some("pptx"), None, Some("deck.pptx"))
            .await
            .unwrap();

        let provider = MsPptProvider::default();
        let chunks = provider.process_file(&guard, None, None).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Welcome");
        assert_eq!(chunks[0].metadata.page, Some(1));
        assert_eq!(chunks[1].content, "Agenda");
        assert_eq!(chunks[1].metadata.page, Some(2));
    }

    #[test]
    fn slide_entries_sort_numerically_not_lexically() {
        let bytes = build_pptx(&["a"; 11]);
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let slides = MsPptProvider::slide_entries(&archive);
        let ns: Vec<u32> = slides.iter().map(|(n, _)| *n).collect();
        assert_eq!(ns, (1..=11).collect::<Vec<u32>>());
    }
}
