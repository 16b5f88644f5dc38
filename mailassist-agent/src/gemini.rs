//! Gemini `generateContent` over REST.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::LlmError;
use crate::llm::{Llm, LlmRequest};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A [`Llm`] backed by the Gemini Generative Language API.
///
/// # Example
///
/// ```rust,ignore
/// use mailassist_agent::{GeminiClient, Llm, LlmRequest};
///
/// let client = GeminiClient::new(std::env::var("GOOGLE_API_KEY")?, "gemini-2.5-flash")?;
/// let text = client.generate(LlmRequest::new("Say hi").with_temperature(0.3)).await?;
/// ```
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("Gemini API key must not be empty".into()));
        }
        let model = model.into();
        let model = model.strip_prefix("models/").map(str::to_string).unwrap_or(model);
        Ok(Self { http: reqwest::Client::new(), api_key, base_url: GEMINI_API_BASE.into(), model })
    }

    /// Point the client at another endpoint, e.g. a proxy or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<&'a str>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Map a failed HTTP exchange to an [`LlmError`].
fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.to_string(), String::new()),
    };

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
        return LlmError::RateLimited { message };
    }
    LlmError::BadResponse { status: status.as_u16(), message }
}

#[async_trait]
impl Llm for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: LlmRequest) -> Result<String, LlmError> {
        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![PartOut { text: &request.prompt }] }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                stop_sequences: request.stop.iter().map(String::as_str).collect(),
            },
        };

        debug!(model = %self.model, prompt_len = request.prompt.len(), "generateContent");
        let response = self
            .http
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "Gemini request failed");
                LlmError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = map_http_error(status, &text);
            warn!(model = %self.model, %status, error = %err, "Gemini API error");
            return Err(err);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Request(format!("failed to parse response: {e}")))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content.parts.into_iter().filter(|p| !p.thought).filter_map(|p| p.text).collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_requests_is_rate_limited() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded for metric","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            map_http_error(StatusCode::TOO_MANY_REQUESTS, body),
            LlmError::RateLimited { message } if message == "Quota exceeded for metric"
        ));
    }

    #[test]
    fn resource_exhausted_status_is_rate_limited() {
        let body = r#"{"error":{"code":400,"message":"out of tokens","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(map_http_error(StatusCode::BAD_REQUEST, body), LlmError::RateLimited { .. }));
    }

    #[test]
    fn other_failures_keep_status() {
        let err = map_http_error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, LlmError::BadResponse { status: 500, ref message } if message == "boom"));
        assert!(!err.is_quota_exhausted());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(GeminiClient::new("  ", "gemini-2.5-flash").is_err());
        assert_eq!(GeminiClient::new("k", "models/gemini-2.5-pro").unwrap().name(), "gemini-2.5-pro");
    }
}
