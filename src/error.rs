//! Error types for the edgequake-doc2html library.
//!
//! A single enum, [`Doc2HtmlError`], covers every failure the library can
//! produce. The four user-facing families are:
//!
//! * **Validation**: nothing to convert, or a file outside the accepted
//!   PDF/PNG/JPEG set. Raised before any I/O happens.
//! * **I/O**: the selected file could not be read.
//! * **Request**: the model call failed (network, auth, quota, bad reply).
//! * **Clipboard**: the system clipboard is missing or refused the write.
//!
//! None of these are fatal: the session controller catches each one where it
//! is raised, turns it into a user-visible message and returns to a ready
//! state. [`Doc2HtmlError::kind`] lets callers branch on the family without
//! matching every variant.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-doc2html library.
#[derive(Debug, Error)]
pub enum Doc2HtmlError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// A conversion was triggered with no file and no pasted text.
    #[error("No input provided: upload a file or paste content (Ctrl+V)")]
    NoInput,

    /// The file is not one of the accepted document types.
    #[error("Unsupported file type for '{path}': only .pdf, .png, .jpg and .jpeg are accepted")]
    UnsupportedFileType { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Reading the selected file failed part-way.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A clipboard image could not be re-encoded as PNG.
    #[error("Failed to encode pasted image: {0}")]
    ImageEncode(String),

    // ── Request errors ────────────────────────────────────────────────────
    /// The model endpoint answered with a non-success status.
    #[error("Model API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request never produced a usable HTTP response.
    #[error("Request to model failed: {0}")]
    RequestFailed(String),

    /// No credential was configured, neither by the user nor the environment.
    #[error("No API key configured.\nSet one in settings (--set-api-key) or export GEMINI_API_KEY.")]
    MissingApiKey,

    // ── Clipboard errors ──────────────────────────────────────────────────
    /// The clipboard is unavailable or the write was denied.
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    // ── Session errors ────────────────────────────────────────────────────
    /// A conversion is already in flight; new requests are rejected, not queued.
    #[error("A conversion is already in progress")]
    Busy,

    /// The event does not apply to the current session state.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    // ── Storage / output errors ───────────────────────────────────────────
    /// The durable credential store could not be read or written.
    #[error("Credential storage error at '{path}': {detail}")]
    Storage { path: PathBuf, detail: String },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error family, used for user messaging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Io,
    Request,
    Clipboard,
    Busy,
    State,
    Storage,
    Output,
    Config,
    Internal,
}

impl Doc2HtmlError {
    /// Classify this error into its family.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoInput | Self::UnsupportedFileType { .. } => ErrorKind::Validation,
            Self::FileNotFound { .. } | Self::FileRead { .. } | Self::ImageEncode(_) => {
                ErrorKind::Io
            }
            Self::ApiError { .. } | Self::RequestFailed(_) | Self::MissingApiKey => {
                ErrorKind::Request
            }
            Self::Clipboard(_) => ErrorKind::Clipboard,
            Self::Busy => ErrorKind::Busy,
            Self::InvalidTransition(_) => ErrorKind::State,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::OutputWriteFailed { .. } => ErrorKind::Output,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<reqwest::Error> for Doc2HtmlError {
    fn from(e: reqwest::Error) -> Self {
        Doc2HtmlError::RequestFailed(e.to_string())
    }
}

impl From<arboard::Error> for Doc2HtmlError {
    fn from(e: arboard::Error) -> Self {
        Doc2HtmlError::Clipboard(e.to_string())
    }
}
