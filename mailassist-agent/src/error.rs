//! Error types for the `mailassist-agent` crate.

use mailassist_rag::RagError;
use thiserror::Error;

/// Errors returned by an [`Llm`](crate::Llm) backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider refused the call because a rate limit or quota is used up.
    #[error("rate limited (429): {message}")]
    RateLimited { message: String },

    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    BadResponse { status: u16, message: String },

    /// The provider answered but produced no text.
    #[error("empty response from model")]
    EmptyResponse,

    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether this error means the provider quota is exhausted.
    ///
    /// [`LlmError::RateLimited`] always is. Other variants only carry provider
    /// text, which is scanned for `429`, `quota` or `resourceexhausted`.
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            other => mentions_quota(&other.to_string()),
        }
    }
}

/// Case-insensitive scan of provider error text for quota markers.
pub fn mentions_quota(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["429", "quota", "resourceexhausted"].iter().any(|marker| lower.contains(marker))
}

/// Errors raised while running the agent or processing an email.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Rag(#[from] RagError),

    /// The model output could not be interpreted.
    #[error("could not parse model output: {0}")]
    Parse(String),
}

impl AgentError {
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_quota_exhausted(),
            other => mentions_quota(&other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
