//! Result types returned by a conversion, and the file writer shared by
//! every output path.

use crate::error::Doc2HtmlError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Sanitized HTML plus run statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// HTML with fence markers removed, ready for the surface.
    pub html: String,
    pub stats: ConversionStats,
}

/// Numbers about one conversion, mostly for logs and `--json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub model: String,
    /// Size of the encoded document part sent to the model.
    pub payload_bytes: usize,
    /// Length of the raw reply before sanitizing.
    pub raw_chars: usize,
    pub html_chars: usize,
    pub prompt_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub duration_ms: u64,
}

/// Write `contents` to `path` via a temp file in the same directory and a
/// rename, so readers never see a partial file. Missing parent directories
/// are created.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> Result<(), Doc2HtmlError> {
    let path = path.as_ref();
    let write_err = |source: std::io::Error| Doc2HtmlError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
