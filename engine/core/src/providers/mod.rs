//! Format providers (§4.4): pluggable parse/chunk/convert-to-PDF strategies
//! dispatched by file extension (or, for mail, MIME type).

mod code;
mod html;
mod markdown;
mod ms_excel;
mod ms_ppt;
mod ms_word;
mod office;
mod outlook;
mod pdf;
mod plain;
mod render;
mod splitter;
mod structured;

pub use pdf::PdfProvider;
pub use splitter::{validate_chunk_overlap, validate_chunk_size, RecursiveCharacterTextSplitter};

use std::sync::Arc;

use async_trait::async_trait;

use crate::chunk::Chunk;
use crate::error::Result;
use crate::source_file::SourceFile;

/// Common contract every concrete format provider implements (§4.4).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable name used as the `format` tag in chunk metadata.
    fn name(&self) -> &'static str;

    /// Filename suffixes this provider claims, compared case-insensitively.
    fn file_name_extensions(&self) -> &'static [&'static str];

    /// True iff `file`'s name ends (case-insensitively) in one of
    /// [`Self::file_name_extensions`]. Mail providers override this with a
    /// MIME-based rule.
    fn supports(&self, file: &SourceFile) -> bool {
        let name = file.file_name().to_ascii_lowercase();
        self.file_name_extensions()
            .iter()
            .any(|ext| name.ends_with(&ext.to_ascii_lowercase()))
    }

    /// Builds a validated splitter for this provider's own defaults.
    fn splitter(
        &self,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<RecursiveCharacterTextSplitter>;

    /// Parses `file` into an ordered list of chunks and runs the splitter
    /// over them. Implementations must sanitise NUL bytes (§8, invariant 6);
    /// [`Chunk::new`] does this already for any freshly constructed chunk.
    async fn process_file(
        &self,
        file: &SourceFile,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<Vec<Chunk>>;

    /// Renders a canonical PDF for `file` at a fresh temp path.
    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile>;

    /// Post-search hook; identity by default.
    fn clean_up(&self, chunk: Chunk) -> Chunk {
        chunk
    }

    /// Whether this provider is safe and worthwhile to run in the isolation
    /// harness's spawned worker (§4.5). Trivial/cheap providers opt out.
    fn multiprocessable(&self) -> bool {
        true
    }
}

/// Ordered set of enabled providers. Dispatch picks the first whose
/// `supports` returns true (§4.4); construction enforces that no two
/// providers claim the same extension.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(pdf::PdfProvider::default()),
            Arc::new(html::HtmlProvider::default()),
            Arc::new(markdown::MarkdownProvider::default()),
            Arc::new(plain::PlainTextProvider::default()),
            Arc::new(structured::StructuredTextProvider::default()),
            Arc::new(code::CodeProvider::default()),
            Arc::new(office::LibreOfficeProvider::default()),
            Arc::new(ms_word::MsWordProvider::default()),
            Arc::new(ms_excel::MsExcelProvider::default()),
            Arc::new(ms_ppt::MsPptProvider::default()),
            Arc::new(outlook::OutlookProvider::default()),
        ];
        Self::debug_assert_no_overlap(&providers);
        Self { providers }
    }

    fn debug_assert_no_overlap(providers: &[Arc<dyn Provider>]) {
        let mut seen = std::collections::HashSet::new();
        for provider in providers {
            for ext in provider.file_name_extensions() {
                let ext = ext.to_ascii_lowercase();
                debug_assert!(
                    seen.insert(ext.clone()),
                    "extension '{ext}' claimed by more than one provider"
                );
            }
        }
    }

    /// Returns the first enabled provider whose `supports` matches `file`.
    pub fn find(&self, file: &SourceFile) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.supports(file)).cloned()
    }

    /// Looks a provider up by its stable `name`, as used for the `format`
    /// chunk metadata tag during search clean-up (§4.7).
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn file_name_extensions(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .flat_map(|p| p.file_name_extensions().iter().copied())
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_no_overlapping_extensions() {
        let registry = ProviderRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for ext in registry.file_name_extensions() {
            assert!(seen.insert(ext.to_ascii_lowercase()), "duplicate extension {ext}");
        }
    }

    #[test]
    fn dispatch_matches_by_extension() {
        let registry = ProviderRegistry::new();
        let file = SourceFile::new("1", "/tmp/x.md", "text/markdown", "birthdays.md", false);
        let provider = registry.find(&file).expect("markdown provider");
        assert_eq!(provider.name(), "markdown");
    }
}
