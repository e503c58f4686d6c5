//! Model interaction: build the two-part request and call the generative API.
//!
//! This is the only stage with network I/O and it stays thin. All
//! prompt wording lives in [`crate::prompts`]; there is no retry loop. One
//! failure is one error, surfaced once by the caller.
//!
//! ## Request Layout
//!
//! A single user turn with two parts, in order:
//! 1. **Document**: inline base64 data with its MIME type, or the pasted text
//!    behind the lead-in sentence
//! 2. **Instructions**: the formatting rules (or the configured override)

use crate::config::ConversionConfig;
use crate::error::Doc2HtmlError;
use crate::pipeline::encode::Payload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// One part of the request content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

/// Binary data embedded in a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Everything the network boundary needs for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

/// Text returned by the model plus optional usage counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub text: String,
    pub prompt_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// The external generative model.
///
/// `GeminiClient` is the production implementation; tests substitute a fake
/// that counts invocations.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, Doc2HtmlError>;
}

/// Assemble the request for a payload: document part first, rules second.
pub fn build_request(payload: Payload, config: &ConversionConfig) -> GenerateRequest {
    let document = match payload {
        Payload::InlineData(file) => ContentPart::InlineData {
            inline_data: InlineData {
                mime_type: file.media_type,
                data: file.data,
            },
        },
        Payload::Text(text) => ContentPart::Text { text },
    };

    GenerateRequest {
        model: config.model.clone(),
        parts: vec![
            document,
            ContentPart::Text {
                text: config.instructions().to_string(),
            },
        ],
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    }
}

// ── Gemini REST client ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: &'a [ContentPart],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
}

/// `generateContent` client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for `config.base_url`, honouring `api_timeout_secs`.
    pub fn new(config: &ConversionConfig) -> Result<Self, Doc2HtmlError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Doc2HtmlError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, Doc2HtmlError> {
        if api_key.is_empty() {
            return Err(Doc2HtmlError::MissingApiKey);
        }

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: &request.parts,
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        };

        let url = self.endpoint(&request.model);
        debug!("POST {} ({} parts)", url, request.parts.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("Gemini API response status: {}", status);

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            warn!("Gemini API error: {} - {}", status, message);
            return Err(Doc2HtmlError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| Doc2HtmlError::RequestFailed(format!("malformed response: {e}")))?;

        Ok(extract_response(parsed))
    }
}

/// Concatenate the text parts of the first candidate; no candidate → "".
fn extract_response(parsed: GeminiResponse) -> GenerateResponse {
    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let usage = parsed.usage_metadata.unwrap_or_default();
    GenerateResponse {
        text,
        prompt_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::EncodedFile;
    use serde_json::json;

    #[test]
    fn payload_part_precedes_rules() {
        let config = ConversionConfig::default();
        let req = build_request(
            Payload::InlineData(EncodedFile {
                data: "QUJD".into(),
                media_type: "image/png".into(),
            }),
            &config,
        );
        assert_eq!(req.parts.len(), 2);
        assert!(matches!(req.parts[0], ContentPart::InlineData { .. }));
        assert_eq!(
            req.parts[1],
            ContentPart::Text {
                text: crate::prompts::FORMATTING_RULES.to_string()
            }
        );
        assert_eq!(req.temperature, 0.1);
        assert_eq!(req.model, "gemini-2.5-flash");
    }

    #[test]
    fn parts_serialize_in_gemini_shape() {
        let parts = vec![
            ContentPart::InlineData {
                inline_data: InlineData {
                    mime_type: "application/pdf".into(),
                    data: "JVBERg==".into(),
                },
            },
            ContentPart::Text { text: "rules".into() },
        ];
        let value = serde_json::to_value(&parts).unwrap();
        assert_eq!(
            value,
            json!([
                {"inlineData": {"mimeType": "application/pdf", "data": "JVBERg=="}},
                {"text": "rules"}
            ])
        );
    }

    #[test]
    fn text_parts_are_concatenated() {
        let parsed: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "<p>A"}, {"text": "</p>"}]}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
        }))
        .unwrap();
        let resp = extract_response(parsed);
        assert_eq!(resp.text, "<p>A</p>");
        assert_eq!(resp.prompt_tokens, Some(12));
        assert_eq!(resp.output_tokens, Some(3));
    }

    #[test]
    fn missing_candidates_yield_empty_text() {
        let parsed: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(extract_response(parsed).text, "");
    }

    #[tokio::test]
    async fn empty_key_fails_before_network() {
        let client = GeminiClient::new(
            &ConversionConfig::builder()
                .base_url("http://127.0.0.1:9")
                .build()
                .unwrap(),
        )
        .unwrap();
        let req = build_request(Payload::Text("x".into()), &ConversionConfig::default());
        let err = client.generate("", &req).await.unwrap_err();
        assert!(matches!(err, Doc2HtmlError::MissingApiKey));
    }
}
