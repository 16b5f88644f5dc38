//! Gemini embedding provider over the Generative Language REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "Gemini";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// `batchEmbedContents` rejects larger batches.
const MAX_REQUESTS_PER_BATCH: usize = 100;

/// An [`EmbeddingProvider`] backed by the Gemini `embedContent` endpoints.
///
/// Single texts go through `models/{model}:embedContent`, batches through
/// `models/{model}:batchEmbedContents`. Documents and queries are embedded
/// with the same task type so both land in the same vector space.
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Default model when none is configured.
    pub const DEFAULT_MODEL: &'static str = "gemini-embedding-001";

    /// Default embedding dimensions for `gemini-embedding-001`.
    pub const DEFAULT_DIMENSIONS: usize = 3072;

    /// Create a new provider using the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::embedding(PROVIDER, "API key must not be empty"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_API_BASE.into(),
            model: Self::DEFAULT_MODEL.into(),
            dimensions: Self::DEFAULT_DIMENSIONS,
        })
    }

    /// Use another embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = model.strip_prefix("models/").map(str::to_string).unwrap_or(model);
        self
    }

    /// Truncate the output vectors to `dims` components.
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Override the API base, e.g. for a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn content_request<'a>(&'a self, text: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content { parts: vec![Part { text }] },
            task_type: "RETRIEVAL_DOCUMENT",
            output_dimensionality: (self.dimensions != Self::DEFAULT_DIMENSIONS)
                .then_some(self.dimensions),
        }
    }

    fn batch_requests<'a>(&'a self, texts: &[&'a str]) -> Vec<BatchEmbedRequest<'a>> {
        texts
            .chunks(MAX_REQUESTS_PER_BATCH)
            .map(|batch| BatchEmbedRequest {
                requests: batch.iter().map(|&text| self.content_request(text)).collect(),
            })
            .collect()
    }

    async fn post<T: Serialize + Sync>(&self, method: &str, body: &T) -> Result<Value> {
        let url = format!("{}/models/{}:{method}", self.base_url, self.model);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                RagError::embedding(PROVIDER, format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::embedding(PROVIDER, format!("API returned {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| RagError::embedding(PROVIDER, format!("failed to parse response: {e}")))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<ContentEmbedding>,
}

fn batch_vectors(response: BatchEmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.embeddings.len() != expected {
        return Err(RagError::embedding(
            PROVIDER,
            format!("expected {expected} embeddings, got {}", response.embeddings.len()),
        ));
    }
    Ok(response.embeddings.into_iter().map(|e| e.values).collect())
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| RagError::embedding(PROVIDER, format!("unexpected response shape: {e}")))
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let value = self.post("embedContent", &self.content_request(text)).await?;
        let response: EmbedContentResponse = decode(value)?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for body in self.batch_requests(texts) {
            let expected = body.requests.len();
            debug!(provider = PROVIDER, batch_size = expected, "embedding batch");
            let value = self.post("batchEmbedContents", &body).await?;
            vectors.extend(batch_vectors(decode(value)?, expected)?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_inputs_are_split_into_batches_of_one_hundred() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap();
        let texts: Vec<String> = (0..250).map(|i| format!("chunk {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let batches = provider.batch_requests(&refs);
        let sizes: Vec<usize> = batches.iter().map(|b| b.requests.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(batches[1].requests[0].content.parts[0].text, "chunk 100");
        assert_eq!(batches[2].requests[49].content.parts[0].text, "chunk 249");
    }

    #[test]
    fn short_batch_response_is_an_error() {
        let response: BatchEmbedResponse =
            serde_json::from_value(serde_json::json!({ "embeddings": [{ "values": [0.5] }] })).unwrap();
        let err = batch_vectors(response, 2).unwrap_err();
        assert!(err.to_string().contains("expected 2 embeddings, got 1"));
    }
}
