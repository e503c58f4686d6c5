//! Export adapters: Word-compatible `.doc` download and clipboard copy.
//!
//! Both adapters export the *current* content. When the editable surface is
//! mounted its live markup wins over the stored result, so edits that have
//! not been committed yet still make it into the export.
//!
//! The `.doc` file is HTML in an Office envelope declared as
//! `application/vnd.ms-word`; Word opens it natively and keeps the tables
//! and inline formatting.

use crate::error::Doc2HtmlError;
use crate::output::write_atomic;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// MIME type declared for the exported document.
pub const WORD_MIME: &str = "application/vnd.ms-word";

/// `<title>` of the exported document.
pub const DOCUMENT_TITLE: &str = "Converted Document";

/// Base name used when the input had no name (pasted text).
pub const FALLBACK_BASE_NAME: &str = "Document";

const WORD_STYLES: &str = "body { font-family: 'Be Vietnam Pro', 'Times New Roman', serif; font-size: 12pt; line-height: 1.5; } \
p { margin-bottom: 6pt; margin-top: 0; } \
table { border-collapse: collapse; width: 100%; margin-top: 10px; border: 2px solid #000; } \
td { border: 1px solid #000; padding: 5px; color: #000; } \
th { border: 1px solid #000; padding: 5px; background-color: #003366; color: #ffffff; font-weight: bold; } \
mjx-container { display: inline-block !important; margin: 0 !important; }";

/// Content to export: the mounted surface if any, else the stored result.
pub fn export_content<'a>(stored: &'a str, surface: Option<&'a str>) -> &'a str {
    surface.unwrap_or(stored)
}

/// Wrap HTML in the Word envelope with embedded print styles.
pub fn word_document(content: &str, title: &str) -> String {
    format!(
        "<html xmlns:o='urn:schemas-microsoft-com:office:office' \
         xmlns:w='urn:schemas-microsoft-com:office:word' \
         xmlns='http://www.w3.org/TR/REC-html40'>\
         <head><meta charset='utf-8'><title>{title}</title>\
         <style>{WORD_STYLES}</style>\
         </head><body>{content}</body></html>"
    )
}

/// `data:` URI for a Word document, percent-encoded.
pub fn word_data_uri(document: &str) -> String {
    format!(
        "data:{WORD_MIME};charset=utf-8,{}",
        urlencoding::encode(document)
    )
}

/// `Converted_<base>.doc`, where `<base>` is the input name up to its first
/// dot, or [`FALLBACK_BASE_NAME`].
pub fn export_file_name(display_name: Option<&str>) -> String {
    let base = display_name
        .and_then(|n| n.split('.').next())
        .filter(|b| !b.is_empty())
        .unwrap_or(FALLBACK_BASE_NAME);
    format!("Converted_{base}.doc")
}

/// A Word document ready to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentExport {
    pub file_name: String,
    pub document: String,
}

impl DocumentExport {
    pub fn data_uri(&self) -> String {
        word_data_uri(&self.document)
    }

    /// Write the document into `dir`, atomically (temp file + rename).
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, Doc2HtmlError> {
        let path = dir.as_ref().join(&self.file_name);
        write_atomic(&path, self.document.as_bytes())?;

        info!("Exported {} ({} bytes)", path.display(), self.document.len());
        Ok(path)
    }
}

/// Build the download for the current content. `None` when there is nothing
/// to export.
pub fn prepare_document(
    stored: &str,
    surface: Option<&str>,
    display_name: Option<&str>,
) -> Option<DocumentExport> {
    let content = export_content(stored, surface);
    if content.is_empty() {
        debug!("Document export skipped: no content");
        return None;
    }
    Some(DocumentExport {
        file_name: export_file_name(display_name),
        document: word_document(content, DOCUMENT_TITLE),
    })
}

// ── Plain-text projection ────────────────────────────────────────────────

static RE_LINE_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|tr|table|ul|ol|blockquote)\s*>").unwrap()
});
static RE_CELL_ENDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</t[dh]\s*>").unwrap());
static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Visible text of rendered markup, roughly what a browser's `innerText`
/// gives: block ends and `<br>` become newlines, cells are tab-separated,
/// entities are decoded.
pub fn plain_text(html: &str) -> String {
    let marked = RE_LINE_BREAKS.replace_all(html, "$0\n");
    let marked = RE_CELL_ENDS.replace_all(&marked, "$0\t");

    let fragment = Html::parse_fragment(&marked);
    let text: String = fragment.root_element().text().collect();

    let lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches([' ', '\t'])).collect();
    RE_BLANK_RUNS
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

// ── Clipboard ────────────────────────────────────────────────────────────

/// Destination for a dual HTML + plain-text copy.
pub trait ClipboardSink {
    /// Write both representations in one operation.
    fn write(&mut self, html: &str, plain: &str) -> Result<(), Doc2HtmlError>;
}

/// The OS clipboard, via `arboard`.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, Doc2HtmlError> {
        Ok(Self {
            inner: arboard::Clipboard::new()?,
        })
    }
}

impl ClipboardSink for SystemClipboard {
    fn write(&mut self, html: &str, plain: &str) -> Result<(), Doc2HtmlError> {
        self.inner.set_html(html, Some(plain))?;
        Ok(())
    }
}

/// User notification produced by a clipboard export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyNotice {
    Copied,
    NothingToCopy,
    Failed,
}

impl CopyNotice {
    pub fn message(&self) -> &'static str {
        match self {
            CopyNotice::Copied => "Content copied! You can paste it into Word right away.",
            CopyNotice::NothingToCopy => "Nothing to copy.",
            CopyNotice::Failed => "Copy failed. Please try again.",
        }
    }
}

/// Copy the current content as HTML plus its visible text.
///
/// Clipboard errors are caught here and reported as [`CopyNotice::Failed`].
pub fn copy_to_clipboard(
    stored: &str,
    surface: Option<&str>,
    sink: &mut dyn ClipboardSink,
) -> CopyNotice {
    let content = export_content(stored, surface);
    if content.is_empty() {
        return CopyNotice::NothingToCopy;
    }

    let mut plain = plain_text(content);
    if plain.is_empty() {
        plain = stored.to_string();
    }

    match sink.write(content, &plain) {
        Ok(()) => {
            info!("Copied {} bytes of HTML to clipboard", content.len());
            CopyNotice::Copied
        }
        Err(e) => {
            warn!("Clipboard write failed: {}", e);
            CopyNotice::Failed
        }
    }
}
