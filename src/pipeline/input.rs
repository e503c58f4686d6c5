//! Input acquisition: normalise a picked file or a paste event into a
//! single [`PendingInput`].
//!
//! Three sources feed a conversion:
//!
//! 1. a file chosen through the picker, restricted to PDF/PNG/JPEG;
//! 2. an image on the clipboard, which always wins over text in the same
//!    paste and is named `Pasted_Image_<unix-millis>.png`;
//! 3. plain text on the clipboard, taken verbatim, but only when the paste
//!    did not land in a text-input control (the control keeps its own paste).
//!
//! Nothing here inspects file content. A malformed PDF is only noticed when
//! the model rejects it.

use crate::error::Doc2HtmlError;
use crate::pipeline::encode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Document types accepted by the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Pdf,
    Png,
    Jpeg,
}

impl MediaType {
    /// MIME type sent alongside the inline data.
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
        }
    }

    /// Resolve from a file extension; this is the picker's type filter.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(MediaType::Pdf),
            "png" => Some(MediaType::Png),
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Where the bytes of a [`FileBlob`] live.
#[derive(Clone, PartialEq, Eq)]
pub enum BlobSource {
    /// Picked from disk; read lazily by the encoder.
    Path(PathBuf),
    /// Already in memory (clipboard image).
    Bytes(Vec<u8>),
}

impl fmt::Debug for BlobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            BlobSource::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
        }
    }
}

/// A binary document waiting to be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub source: BlobSource,
    pub media_type: MediaType,
    pub display_name: String,
}

/// The currently selected, not-yet-converted input.
///
/// Exactly one variant is active; choosing a new input replaces the old one
/// wholesale, so a file and pasted text can never coexist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingInput {
    #[default]
    None,
    FileBlob(FileBlob),
    PastedText(String),
}

impl PendingInput {
    pub fn is_none(&self) -> bool {
        matches!(self, PendingInput::None)
    }

    /// True when there is nothing to convert: no selection, or pasted text
    /// that is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            PendingInput::None => true,
            PendingInput::PastedText(text) => text.is_empty(),
            PendingInput::FileBlob(_) => false,
        }
    }

    /// Name shown to the user and used to derive the export file name.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            PendingInput::FileBlob(blob) => Some(&blob.display_name),
            _ => None,
        }
    }
}

/// Build a [`PendingInput`] from a picked file.
///
/// Only the extension is checked; the file must exist but is not read here.
pub fn select_file(path: impl AsRef<Path>) -> Result<PendingInput, Doc2HtmlError> {
    let path = path.as_ref().to_path_buf();
    let media_type = MediaType::from_path(&path)
        .ok_or_else(|| Doc2HtmlError::UnsupportedFileType { path: path.clone() })?;

    if !path.is_file() {
        return Err(Doc2HtmlError::FileNotFound { path });
    }

    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!("Selected {} ({})", path.display(), media_type);
    Ok(PendingInput::FileBlob(FileBlob {
        source: BlobSource::Path(path),
        media_type,
        display_name,
    }))
}

// ── Paste events ────────────────────────────────────────────────────────

/// Element that received the paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteTarget {
    /// An input, textarea or editable region: it handles text itself.
    TextInput,
    /// Anything else (the page body, a panel, the terminal).
    Surface,
}

/// One item of clipboard data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardItem {
    /// PNG-encoded image bytes.
    Image(Vec<u8>),
    Text(String),
}

/// A paste, as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteEvent {
    pub items: Vec<ClipboardItem>,
    pub target: PasteTarget,
}

/// Result of interpreting a paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteOutcome {
    pub input: PendingInput,
    /// The host must not run its own paste handling.
    pub suppress_default: bool,
}

/// Name given to a pasted image.
pub fn pasted_image_name(now: DateTime<Utc>) -> String {
    format!("Pasted_Image_{}.png", now.timestamp_millis())
}

/// Interpret a paste event. Returns `None` when nothing usable was pasted.
pub fn read_paste(event: &PasteEvent, now: DateTime<Utc>) -> Option<PasteOutcome> {
    for item in &event.items {
        if let ClipboardItem::Image(bytes) = item {
            let display_name = pasted_image_name(now);
            info!("Pasted image captured as {}", display_name);
            return Some(PasteOutcome {
                input: PendingInput::FileBlob(FileBlob {
                    source: BlobSource::Bytes(bytes.clone()),
                    media_type: MediaType::Png,
                    display_name,
                }),
                suppress_default: true,
            });
        }
    }

    if event.target == PasteTarget::TextInput {
        return None;
    }

    event.items.iter().find_map(|item| match item {
        ClipboardItem::Text(text) if !text.is_empty() => Some(PasteOutcome {
            input: PendingInput::PastedText(text.clone()),
            suppress_default: false,
        }),
        _ => None,
    })
}

/// Snapshot the system clipboard as a paste event aimed at the surface.
///
/// An image is PNG-encoded first; text is read only when no image exists.
pub fn paste_from_system_clipboard() -> Result<PasteEvent, Doc2HtmlError> {
    let mut clipboard = arboard::Clipboard::new()?;
    let mut items = Vec::new();

    if let Ok(img) = clipboard.get_image() {
        let png = encode::rgba_to_png(img.width as u32, img.height as u32, img.bytes.into_owned())?;
        items.push(ClipboardItem::Image(png));
    } else if let Ok(text) = clipboard.get_text() {
        items.push(ClipboardItem::Text(text));
    }

    Ok(PasteEvent {
        items,
        target: PasteTarget::Surface,
    })
}
