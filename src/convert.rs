//! Conversion entry points.
//!
//! [`Converter`] runs the pipeline once per call:
//!
//! ```text
//! PendingInput ─▶ encode ─▶ build request ─▶ model ─▶ sanitize ─▶ ConversionOutput
//! ```
//!
//! A converter holds a single-slot in-flight guard. A second call made while
//! one is outstanding is rejected with [`Doc2HtmlError::Busy`]; it is never
//! queued. There is no retry and no cancellation: one call, one outcome.
//!
//! The free functions [`convert`] and [`convert_to_file`] build a
//! Gemini-backed converter from a [`ConversionConfig`] for one-shot use.

use crate::config::ConversionConfig;
use crate::error::Doc2HtmlError;
use crate::output::{write_atomic, ConversionOutput, ConversionStats};
use crate::pipeline::encode;
use crate::pipeline::input::PendingInput;
use crate::pipeline::llm::{build_request, GeminiClient, GenerativeModel};
use crate::pipeline::postprocess::sanitize;
use crate::progress::{STATUS_ANALYZING, STATUS_FORMATTING};
use crate::storage::resolve_api_key;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Prefix of the user-visible message for a failed conversion.
pub const CONVERSION_ERROR_PREFIX: &str = "Conversion error: ";

/// User-visible message for a failed conversion.
pub fn conversion_error_message(err: &Doc2HtmlError) -> String {
    format!("{CONVERSION_ERROR_PREFIX}{err}")
}

/// Runs conversions against one model, one at a time.
pub struct Converter {
    model: Arc<dyn GenerativeModel>,
    config: ConversionConfig,
    in_flight: AtomicBool,
}

/// Releases the in-flight slot on drop, whichever way the call ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, Doc2HtmlError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(flag))
            .map_err(|_| Doc2HtmlError::Busy)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Converter {
    pub fn new(model: Arc<dyn GenerativeModel>, config: ConversionConfig) -> Self {
        Self {
            model,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Converter backed by the Gemini REST API at `config.base_url`.
    pub fn gemini(config: ConversionConfig) -> Result<Self, Doc2HtmlError> {
        let client = GeminiClient::new(&config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Whether a conversion is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Convert `input`, reporting status strings to the configured callback.
    pub async fn convert(
        &self,
        input: &PendingInput,
        api_key: &str,
    ) -> Result<ConversionOutput, Doc2HtmlError> {
        self.convert_with_status(input, api_key, |_| {}).await
    }

    /// Like [`Converter::convert`], also handing each status to `on_status`.
    ///
    /// A missing input is rejected before the in-flight slot is taken and
    /// before any I/O.
    pub async fn convert_with_status<F>(
        &self,
        input: &PendingInput,
        api_key: &str,
        mut on_status: F,
    ) -> Result<ConversionOutput, Doc2HtmlError>
    where
        F: FnMut(&str) + Send,
    {
        if input.is_empty() {
            return Err(Doc2HtmlError::NoInput);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let cb = self.config.progress_callback.as_ref();

        if let Some(cb) = cb {
            cb.on_conversion_start();
        }
        let mut report = |status: &str| {
            on_status(status);
            if let Some(cb) = cb {
                cb.on_status(status);
            }
        };

        let result = self.run(input, api_key, &mut report).await;

        match &result {
            Ok(output) => {
                if let Some(cb) = cb {
                    cb.on_conversion_complete(output.html.len());
                }
            }
            Err(e) => {
                warn!("Conversion failed: {}", e);
                if let Some(cb) = cb {
                    cb.on_conversion_error(&conversion_error_message(e));
                }
            }
        }
        result
    }

    async fn run(
        &self,
        input: &PendingInput,
        api_key: &str,
        report: &mut (dyn FnMut(&str) + Send),
    ) -> Result<ConversionOutput, Doc2HtmlError> {
        let start = Instant::now();
        info!("Starting conversion with {}", self.config.model);

        // ── Step 1: Encode input ─────────────────────────────────────────
        report(STATUS_ANALYZING);
        let payload = encode::encode_input(input).await?;
        let payload_bytes = payload.len();
        debug!("Payload ready: {} bytes", payload_bytes);

        // ── Step 2: Call the model ───────────────────────────────────────
        report(STATUS_FORMATTING);
        let request = build_request(payload, &self.config);
        let response = self.model.generate(api_key, &request).await?;

        // ── Step 3: Sanitize ─────────────────────────────────────────────
        let html = sanitize(&response.text);

        let stats = ConversionStats {
            model: self.config.model.clone(),
            payload_bytes,
            raw_chars: response.text.chars().count(),
            html_chars: html.chars().count(),
            prompt_tokens: response.prompt_tokens,
            output_tokens: response.output_tokens,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Conversion complete: {} chars of HTML in {}ms",
            stats.html_chars, stats.duration_ms
        );
        Ok(ConversionOutput { html, stats })
    }
}

/// Convert one input with a Gemini client built from `config`.
///
/// The API key comes from `config.api_key`, then `GEMINI_API_KEY`.
pub async fn convert(
    input: &PendingInput,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2HtmlError> {
    let api_key = resolve_api_key("", config.api_key.as_deref());
    Converter::gemini(config.clone())?
        .convert(input, &api_key)
        .await
}

/// Convert and write the HTML directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input: &PendingInput,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Doc2HtmlError> {
    let output = convert(input, config).await?;
    write_atomic(output_path, output.html.as_bytes())?;
    Ok(output.stats)
}
