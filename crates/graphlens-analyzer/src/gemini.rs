//! HTTP client for the Gemini `generateContent` REST endpoint.
//!
//! One client serves both the vision and the text capability; the model used
//! for each is configurable. Responses are requested as
//! `application/json` so the model returns a bare JSON document.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use graphlens_core::{AppConfig, ModelConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzeError;
use crate::image::ChartImage;
use crate::model::{TextModel, VisionModel};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const PING_PROMPT: &str = "Reply with the words: API connection successful";

/// Client for the Gemini REST API.
///
/// Use [`GeminiClient::new`] for production or [`GeminiClient::with_base_url`]
/// to point at a mock server in tests.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    vision_model: String,
    text_model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

impl GenerationConfig {
    fn json() -> Self {
        Self {
            response_mime_type: "application/json",
            temperature: 0.2,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiClient {
    /// Creates a client pointed at the production Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::UpstreamUnavailable`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, AnalyzeError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::UpstreamUnavailable`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AnalyzeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("graphlens/0.1 (chart-insights)")
            .build()
            .map_err(|e| AnalyzeError::UpstreamUnavailable(format!("HTTP client setup: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            vision_model: DEFAULT_MODEL.to_owned(),
            text_model: DEFAULT_MODEL.to_owned(),
        })
    }

    /// Builds a client from the application configuration.
    ///
    /// # Errors
    ///
    /// See [`GeminiClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AnalyzeError> {
        Self::from_model_config(&config.model_config())
    }

    /// Builds a client from the model API settings alone.
    ///
    /// # Errors
    ///
    /// See [`GeminiClient::with_base_url`].
    pub fn from_model_config(config: &ModelConfig) -> Result<Self, AnalyzeError> {
        Ok(Self::with_base_url(
            &config.gemini_api_key,
            config.upstream_timeout_secs,
            &config.gemini_base_url,
        )?
        .with_models(&config.vision_model, &config.text_model))
    }

    /// Overrides the model names used for the vision and text calls.
    #[must_use]
    pub fn with_models(mut self, vision_model: &str, text_model: &str) -> Self {
        self.vision_model = vision_model.to_owned();
        self.text_model = text_model.to_owned();
        self
    }

    /// Sends a trivial text prompt to the text model and returns its reply.
    ///
    /// # Errors
    ///
    /// Same classification as [`TextModel::complete`].
    pub async fn ping(&self) -> Result<String, AnalyzeError> {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: vec![Part::Text { text: PING_PROMPT }],
            }],
            generation_config: None,
        };
        self.generate(&self.text_model, &request).await
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    /// Posts a `generateContent` request and returns the concatenated text
    /// of the first candidate.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<String, AnalyzeError> {
        tracing::debug!(model, "sending generateContent request");

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "failed" };
                AnalyzeError::UpstreamUnavailable(format!("Gemini request {kind}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzeError::UpstreamUnavailable(format!(
                "Gemini returned status {status}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AnalyzeError::UpstreamUnavailable(format!("Gemini response timed out: {e}"))
            } else {
                AnalyzeError::UpstreamFormat(format!("Gemini response parse error: {e}"))
            }
        })?;

        extract_text(body)
    }
}

fn extract_text(body: GenerateResponse) -> Result<String, AnalyzeError> {
    let Some(candidate) = body.candidates.into_iter().next() else {
        let reason = body
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(AnalyzeError::UpstreamFormat(format!(
            "Gemini returned no content ({reason})"
        )));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty response".to_string());
        return Err(AnalyzeError::UpstreamFormat(format!(
            "Gemini returned no text ({reason})"
        )));
    }

    Ok(text)
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn extract(
        &self,
        instruction: &str,
        image: &ChartImage<'_>,
    ) -> Result<String, AnalyzeError> {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: vec![
                    Part::Text { text: instruction },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime_type(),
                            data: STANDARD.encode(image.bytes()),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig::json()),
        };
        self.generate(&self.vision_model, &request).await
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn complete(&self, instruction: &str) -> Result<String, AnalyzeError> {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: vec![Part::Text { text: instruction }],
            }],
            generation_config: Some(GenerationConfig::json()),
        };
        self.generate(&self.text_model, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client = GeminiClient::with_base_url("k", 30, "http://localhost:9999/").unwrap();
        assert_eq!(
            client.endpoint("gemini-2.0-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn request_serializes_to_gemini_shape() {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: vec![
                    Part::Text { text: "describe" },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: STANDARD.encode(b"png"),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig::json()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "describe");
        assert_eq!(
            value["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(value["contents"][0]["parts"][1]["inlineData"]["data"], "cG5n");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn ping_request_omits_generation_config() {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: vec![Part::Text { text: PING_PROMPT }],
            }],
            generation_config: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn extract_text_joins_parts() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]
        }))
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn extract_text_reports_block_reason() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        let err = extract_text(body).unwrap_err();
        assert!(matches!(err, AnalyzeError::UpstreamFormat(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn extract_text_rejects_empty_candidate() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        let err = extract_text(body).unwrap_err();
        assert!(matches!(err, AnalyzeError::UpstreamFormat(ref m) if m.contains("MAX_TOKENS")));
    }
}
