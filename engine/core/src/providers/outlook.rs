//! The `outlook` provider: mail messages (`.msg`, and `.eml` by MIME type),
//! preferring the HTML body over the plain body, grounded directly in the
//! original `outlook_provider.py`'s `Message.html_body`/`.body` fallback.

use async_trait::async_trait;
use mail_parser::MessageParser;

use super::render::generate_pdf_from_markdown;
use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{html::HtmlProvider, Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::source_file::SourceFile;

const DEFAULT_CHUNK_SIZE: usize = 500;
const DEFAULT_CHUNK_OVERLAP: usize = 0;

pub struct OutlookProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl OutlookProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }

    fn parse(bytes: &[u8]) -> Result<mail_parser::Message<'_>> {
        MessageParser::default()
            .parse(bytes)
            .ok_or_else(|| Error::processing(400, "failed to parse mail message"))
    }

    fn sender(message: &mail_parser::Message<'_>) -> Option<String> {
        message
            .from()
            .and_then(|addr| addr.first())
            .and_then(|a| a.address())
            .map(str::to_string)
    }

    fn date(message: &mail_parser::Message<'_>) -> Option<String> {
        message.date().map(|d| d.to_rfc3339())
    }
}

impl Default for OutlookProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for OutlookProvider {
    fn name(&self) -> &'static str {
        "outlook"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".msg"]
    }

    fn supports(&self, file: &SourceFile) -> bool {
        let name = file.file_name().to_ascii_lowercase();
        name.ends_with(".msg") || name.ends_with(".eml") || file.mime_type() == "message/rfc822"
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
        let message = Self::parse(&bytes)?;

        let text = message
            .body_html(0)
            .or_else(|| message.body_text(0))
            .map(|c| c.into_owned())
            .unwrap_or_default();

        let subject = message.subject().unwrap_or_default().to_string();
        let sender = Self::sender(&message).unwrap_or_default();
        let date = Self::date(&message);

        let mut chunk = Chunk::new(text)
            .with_extra("sender", sender)
            .with_extra("subject", subject);
        if let Some(date) = date {
            chunk = chunk.with_extra("date", date);
        }

        let splitter = self.splitter(chunk_size, chunk_overlap)?;
        Ok(splitter.split_chunks(vec![chunk]))
    }

    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile> {
        let bytes = file.buffer().await?;
        let message = Self::parse(&bytes)?;

        if let Some(html) = message.body_html(0) {
            let html_guard = crate::source_file::temp_file(
                html.as_bytes(),
                Some("html"),
                Some("text/html"),
                Some(file.file_name()),
            )
            .await?;
            let converted = HtmlProvider::default().convert_file_to_pdf(&html_guard).await?;
            return Ok(SourceFile::new(
                file.id(),
                converted.path().to_path_buf(),
                converted.mime_type(),
                converted.file_name(),
                converted.delete_dir(),
            ));
        }

        let text = message.body_text(0).map(|c| c.into_owned()).unwrap_or_else(|| "[empty body]".to_string());
        let sender = Self::sender(&message).unwrap_or_default();
        let subject = message.subject().unwrap_or_default();
        let markdown = format!("# From: {sender}\nSubject: {subject}\n\n{text}");

        generate_pdf_from_markdown(&markdown, file.id(), file.file_name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EML: &[u8] = b"From: alice@example.com\r\n\
Subject: Birthday reminder\r\n\
Date: Mon, 1 Jan 2024 09:00:00 +0000\r\n\
Content-Type: text/plain\r\n\
\r\n\
Don't forget Dagobert's birthday next week.\r\n";

    #[tokio::test]
    async fn plain_body_carries_sender_subject_and_date_as_extras() {
        let guard = crate::source_file::temp_file(EML, Some("eml"), Some("message/rfc822"), Some("reminder.eml"))
            .await
            .unwrap();

        let provider = OutlookProvider::default();
        let chunks = provider.process_file(&guard, None, None).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("Dagobert's birthday"));
        assert_eq!(chunks[0].metadata.extra.get("sender").map(String::as_str), Some("alice@example.com"));
        assert_eq!(chunks[0].metadata.extra.get("subject").map(String::as_str), Some("Birthday reminder"));
        assert!(chunks[0].metadata.extra.contains_key("date"));
    }

    #[test]
    fn supports_eml_by_extension_and_rfc822_mime_type() {
        let provider = OutlookProvider::default();
        let by_ext = SourceFile::new("1", "/tmp/x.eml".into(), "application/octet-stream", "mail.eml", false);
        let by_mime = SourceFile::new("2", "/tmp/y.bin".into(), "message/rfc822", "mail.bin", false);
        let neither = SourceFile::new("3", "/tmp/z.txt".into(), "text/plain", "notes.txt", false);

        assert!(provider.supports(&by_ext));
        assert!(provider.supports(&by_mime));
        assert!(!provider.supports(&neither));
    }
}
