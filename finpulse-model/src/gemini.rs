//! Gemini generation service using the `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::generation::GenerationService;

/// The default Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default model.
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash";

const PROVIDER: &str = "Gemini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A [`GenerationService`] backed by the Gemini API.
///
/// # Configuration
///
/// - `model` – defaults to `models/gemini-2.0-flash`.
/// - `api_key` – from the constructor or the `GEMINI_API_KEY` environment variable.
/// - `timeout` – per request, defaults to 60 seconds.
///
/// # Example
///
/// ```rust,ignore
/// use finpulse_model::{GeminiClient, GenerationService};
///
/// let client = GeminiClient::from_env()?;
/// let text = client.complete("Summarize Apple's quarter.").await?;
/// ```
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ModelError::ConfigError("Gemini API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create a new client using the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            ModelError::ConfigError("GEMINI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Set the model, with or without the `models/` prefix.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model =
            if model.starts_with("models/") { model } else { format!("models/{model}") };
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
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

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String> {
        let blocked = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(ModelError::EmptyResponse {
                provider: PROVIDER.into(),
                reason: blocked.map_or_else(|| "no candidates".into(), |r| format!("blocked: {r}")),
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse {
                provider: PROVIDER.into(),
                reason: candidate.finish_reason.unwrap_or_else(|| "empty candidate".into()),
            });
        }
        Ok(text.trim().to_string())
    }
}

// ── GenerationService implementation ───────────────────────────────

#[async_trait]
impl GenerationService for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let request_body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                ModelError::RequestError { provider: PROVIDER.into(), message: e.to_string() }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(ModelError::ApiError {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                message: detail,
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            ModelError::RequestError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        parsed.into_text()
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<String> {
        serde_json::from_str::<GenerateContentResponse>(raw).unwrap().into_text()
    }

    #[test]
    fn rejects_empty_key() {
        assert!(matches!(GeminiClient::new("  "), Err(ModelError::ConfigError(_))));
    }

    #[test]
    fn model_gets_prefixed() {
        let client = GeminiClient::new("key").unwrap().with_model("gemini-2.5-flash");
        assert_eq!(client.model(), "models/gemini-2.5-flash");
        assert_eq!(
            client.with_base_url("http://localhost:8080/").endpoint(),
            "http://localhost:8080/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn joins_candidate_parts() {
        let text = parse(
            r#"{"candidates": [{"content": {"parts": [{"text": " Revenue rose "}, {"text": "[S1]. "}]},
                 "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(text, "Revenue rose [S1].");
    }

    #[test]
    fn blocked_prompt_is_an_empty_response() {
        let err = parse(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap_err();
        assert!(err.to_string().contains("blocked: SAFETY"));

        let err = parse(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
