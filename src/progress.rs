//! Progress-callback trait for conversion status events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! the human-readable status strings a conversion emits.
//!
//! A conversion reports exactly two statuses, in order: [`STATUS_ANALYZING`]
//! before the payload is prepared and [`STATUS_FORMATTING`] right before the
//! model call. There is no intermediate streaming.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2html::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::Arc;
//!
//! struct StderrStatus;
//!
//! impl ConversionProgressCallback for StderrStatus {
//!     fn on_status(&self, status: &str) {
//!         eprintln!("… {status}");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(StderrStatus) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// First status: shown while the input is being read and encoded.
pub const STATUS_ANALYZING: &str = "Analyzing and formatting…";

/// Second status: shown while the model applies the formatting rules.
pub const STATUS_FORMATTING: &str = "Applying requested formatting…";

/// Called by the conversion pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any I/O happens.
    fn on_conversion_start(&self) {}

    /// Called with each human-readable status string.
    fn on_status(&self, status: &str) {
        let _ = status;
    }

    /// Called when the model reply has been sanitized.
    ///
    /// # Arguments
    /// * `html_len`: byte length of the produced HTML
    fn on_conversion_complete(&self, html_len: usize) {
        let _ = html_len;
    }

    /// Called when the conversion failed; `error` is the user-visible message.
    fn on_conversion_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
