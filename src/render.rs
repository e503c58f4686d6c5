//! Render/edit surface: one backing HTML string, two ways to show it.
//!
//! * [`ViewMode::Edit`] renders the result as live, user-mutable markup. The
//!   host reports edits back through a single commit hook (fired on `input`
//!   and `blur`), which overwrites the stored result in full.
//! * [`ViewMode::Preview`] renders the same string read-only and, when a math
//!   library is configured, schedules a re-typesetting pass after a short
//!   delay. Without the library the page is plain HTML.
//!
//! [`render`] is pure. The surface never mutates anything itself; all writes
//! go through [`crate::session::SessionEvent::EditCommitted`].
//!
//! Edits still being composed when the surface goes away (no `input`/`blur`
//! yet) are not captured. This is a known gap of the commit-on-event model.

use serde::{Deserialize, Serialize};

/// Default MathJax v3 bundle (TeX + MathML input, CommonHTML output).
pub const MATHJAX_CDN: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js";

/// Delay before the preview typesetting pass.
pub const TYPESET_DELAY_MS: u64 = 100;

/// Element id of the rendered surface inside generated pages.
pub const SURFACE_ID: &str = "doc2html-surface";

/// Which rendering path is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    /// Mutable surface (default after every new result).
    #[default]
    Edit,
    /// Read-only surface with math typesetting.
    Preview,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Edit => ViewMode::Preview,
            ViewMode::Preview => ViewMode::Edit,
        }
    }
}

/// Preview-path settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOptions {
    /// Script URL of the math library. `None` disables typesetting.
    pub mathjax_url: Option<String>,
    pub typeset_delay_ms: u64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            mathjax_url: Some(MATHJAX_CDN.to_string()),
            typeset_delay_ms: TYPESET_DELAY_MS,
        }
    }
}

/// A deferred math re-typesetting pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypesetPass {
    pub script_url: String,
    pub delay_ms: u64,
}

/// Output of [`render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub mode: ViewMode,
    pub markup: String,
    pub editable: bool,
    pub typeset: Option<TypesetPass>,
}

/// Render `result` for `mode`.
///
/// Preview only schedules typesetting when there is something to typeset and
/// a library is configured.
pub fn render(result: &str, mode: ViewMode, options: &PreviewOptions) -> RenderedView {
    match mode {
        ViewMode::Edit => RenderedView {
            mode,
            markup: result.to_string(),
            editable: true,
            typeset: None,
        },
        ViewMode::Preview => RenderedView {
            mode,
            markup: result.to_string(),
            editable: false,
            typeset: match (&options.mathjax_url, result.is_empty()) {
                (Some(url), false) => Some(TypesetPass {
                    script_url: url.clone(),
                    delay_ms: options.typeset_delay_ms,
                }),
                _ => None,
            },
        },
    }
}

impl RenderedView {
    /// Standalone HTML page for this view.
    ///
    /// The edit page calls `window.doc2htmlCommit(innerHTML)` on `input` and
    /// `blur` when the host defines it.
    pub fn to_page(&self, title: &str) -> String {
        let mut page = String::with_capacity(self.markup.len() + 1024);
        page.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>");
        page.push_str(&escape_text(title));
        page.push_str("</title>\n");

        if let Some(pass) = &self.typeset {
            page.push_str(
                "<script>window.MathJax = { tex: { inlineMath: [['$', '$'], ['\\\\(', '\\\\)']], \
                 displayMath: [['$$', '$$'], ['\\\\[', '\\\\]']] }, startup: { typeset: false } };</script>\n",
            );
            page.push_str(&format!(
                "<script async src=\"{}\"></script>\n",
                escape_attr(&pass.script_url)
            ));
        }
        page.push_str("</head><body>\n");

        if self.editable {
            page.push_str(&format!(
                "<div id=\"{SURFACE_ID}\" contenteditable=\"true\">{}</div>\n",
                self.markup
            ));
            page.push_str(&format!(
                "<script>(function () {{\n\
                 var el = document.getElementById('{SURFACE_ID}');\n\
                 function commit() {{ if (window.doc2htmlCommit) window.doc2htmlCommit(el.innerHTML); }}\n\
                 el.addEventListener('input', commit);\n\
                 el.addEventListener('blur', commit);\n\
                 }})();</script>\n"
            ));
        } else {
            page.push_str(&format!("<div id=\"{SURFACE_ID}\">{}</div>\n", self.markup));
        }

        if let Some(pass) = &self.typeset {
            page.push_str(&format!(
                "<script>setTimeout(function () {{\n\
                 if (window.MathJax && window.MathJax.typesetPromise) window.MathJax.typesetPromise();\n\
                 }}, {});</script>\n",
                pass.delay_ms
            ));
        }

        page.push_str("</body></html>\n");
        page
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
