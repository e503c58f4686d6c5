//! # edgequake-doc2html
//!
//! Turn scanned exam papers, worksheets and pasted notes into clean,
//! Word-ready HTML using Google Gemini.
//!
//! ## Why this crate?
//!
//! Copying a PDF or a photo of a worksheet into Word loses tables, breaks
//! formulas and scrambles numbering. Instead this crate hands the document
//! to a multimodal model together with a fixed set of formatting rules and
//! gets back one HTML fragment: tables as `<table>`, math as `$…$` / `$$…$$`,
//! everything else as flowing text. The fragment can be edited, previewed
//! with MathJax, saved as a `.doc` file or copied to the clipboard.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file / paste
//!  │
//!  ├─ 1. Input     picked PDF/PNG/JPEG, clipboard image or clipboard text
//!  ├─ 2. Encode    bytes → base64 inline data, or text behind a lead-in
//!  ├─ 3. Model     one generateContent call (document part + rules)
//!  ├─ 4. Sanitize  strip code-fence markers, trim
//!  └─ 5. Session   result lands on the edit surface; export from there
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2html::{convert, pipeline::input::select_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key taken from GEMINI_API_KEY
//!     let config = ConversionConfig::default();
//!     let input = select_file("exam.pdf")?;
//!     let output = convert(&input, &config).await?;
//!     println!("{}", output.html);
//!     Ok(())
//! }
//! ```
//!
//! Interactive hosts drive a [`Controller`] instead: it owns the
//! [`Session`], persists the API key and maps every user action to a
//! session event.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2html` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doc2html = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod app;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod session;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use app::Controller;
pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_to_file, Converter};
pub use error::{Doc2HtmlError, ErrorKind};
pub use export::{ClipboardSink, CopyNotice, DocumentExport, SystemClipboard};
pub use output::{write_atomic, ConversionOutput, ConversionStats};
pub use pipeline::input::{ClipboardItem, MediaType, PasteEvent, PasteTarget, PendingInput};
pub use pipeline::llm::{GeminiClient, GenerativeModel};
pub use pipeline::postprocess::sanitize;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::{PreviewOptions, RenderedView, ViewMode};
pub use session::{Session, SessionEvent, Tab};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
