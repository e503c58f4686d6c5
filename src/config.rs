//! Configuration types for document-to-HTML conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults reproduce the fixed
//! behaviour of the tool: `gemini-2.5-flash`, temperature 0.1, the built-in
//! formatting rules and no explicit request timeout.

use crate::error::Doc2HtmlError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default model identifier sent to the generative endpoint.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default REST root of the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a single conversion.
///
/// # Example
/// ```rust
/// use edgequake_doc2html::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .model("gemini-2.5-pro")
///     .temperature(0.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.5-pro");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Model identifier, e.g. "gemini-2.5-flash". Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Kept near zero so the model transcribes instead of paraphrasing.
    pub temperature: f32,

    /// Upper bound on generated tokens. `None` leaves the server default.
    pub max_output_tokens: Option<u32>,

    /// API key used when the session has no user-supplied credential.
    pub api_key: Option<String>,

    /// REST root of the generative API. Overridden in tests to point at a mock.
    pub base_url: String,

    /// Custom instruction block. If None, uses [`crate::prompts::FORMATTING_RULES`].
    pub system_prompt: Option<String>,

    /// Per-request timeout in seconds. `None` relies on the transport default.
    pub api_timeout_secs: Option<u64>,

    /// Receives the human-readable status strings of a conversion.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_output_tokens: None,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt: None,
            api_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The instruction block sent after the payload part.
    pub fn instructions(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::FORMATTING_RULES)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Doc2HtmlError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Doc2HtmlError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Doc2HtmlError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(Doc2HtmlError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
