//! PDF rendering shared by the text-shaped providers (markdown, plain, the
//! structured-text provider, and code): markdown is turned into
//! syntax-highlighted HTML, then handed to an external HTML-to-PDF renderer,
//! the same shape as the html provider's own conversion (§4.4).

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use syntect::highlighting::ThemeSet;

use crate::error::{Error, Result};
use crate::source_file::{fresh_temp_path, temp_file, SourceFile};

/// Invokes an external HTML-to-PDF renderer (`wkhtmltopdf`) on `html`,
/// writing the result to a fresh path under the temp root.
pub async fn render_html_to_pdf(html: &str, doc_id: &str, file_name: &str) -> Result<SourceFile> {
    let html_guard = temp_file(html.as_bytes(), Some("html"), Some("text/html"), None).await?;
    let pdf_path = fresh_temp_path(Some("pdf"))?;

    let output = tokio::process::Command::new("wkhtmltopdf")
        .arg("--quiet")
        .arg(html_guard.path())
        .arg(&pdf_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(Error::Conversion {
            exit_status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(SourceFile::new(doc_id, pdf_path, "application/pdf", file_name, false))
}

/// Converts markdown to HTML, syntax-highlighting fenced code blocks with
/// `syntect` the way the teacher source's `generate_pdf_from_md` does with
/// Pygments.
pub fn markdown_to_html(markdown_text: &str) -> String {
    let syntax_set = SyntaxSet::load_defaults_newlines();
    let theme_set = ThemeSet::load_defaults();
    let theme = &theme_set.themes["InspiredGitHub"];

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown_text, options);

    let mut events = Vec::new();
    let mut in_code_block = false;
    let mut code_lang = String::new();
    let mut code_buf = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                in_code_block = true;
                code_lang = lang.to_string();
                code_buf.clear();
            }
            Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)) => {
                in_code_block = true;
                code_lang.clear();
                code_buf.clear();
            }
            Event::Text(text) if in_code_block => {
                code_buf.push_str(&text);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                let syntax = syntax_set
                    .find_syntax_by_token(&code_lang)
                    .unwrap_or_else(|| syntax_set.find_syntax_plain_text());
                let highlighted = highlighted_html_for_string(&code_buf, &syntax_set, syntax, theme)
                    .unwrap_or_else(|_| format!("<pre><code>{code_buf}</code></pre>"));
                events.push(Event::Html(highlighted.into()));
            }
            other => {
                if !in_code_block {
                    events.push(other);
                }
            }
        }
    }

    let mut html_out = String::new();
    html::push_html(&mut html_out, events.into_iter());
    html_out
}

/// Full pipeline: markdown text -> highlighted HTML -> rendered PDF.
pub async fn generate_pdf_from_markdown(
    markdown_text: &str,
    doc_id: &str,
    file_name: &str,
) -> Result<SourceFile> {
    let body = markdown_to_html(markdown_text);
    let html_doc = format!("<html><head><meta charset=\"utf-8\"></head><body>{body}</body></html>");
    render_html_to_pdf(&html_doc, doc_id, file_name).await
}

/// Wraps `text` in a fenced code block tagged with `format_hint` (unless the
/// hint names plain text itself) before rendering, matching
/// `generate_pdf_from_md_file` in the teacher source.
pub async fn generate_pdf_from_text(
    text: &str,
    format_hint: Option<&str>,
    doc_id: &str,
    file_name: &str,
) -> Result<SourceFile> {
    let markdown_text = match format_hint {
        Some(f) if matches!(f, "plain" | "md" | "markdown") => text.to_string(),
        Some(f) => format!("```{f}\n{text}\n```"),
        None => text.to_string(),
    };
    generate_pdf_from_markdown(&markdown_text, doc_id, file_name).await
}
