//! Failures raised while loading, indexing or searching policy documents.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// A PDF or DOCX file yielded no usable text.
    #[error("Error loading {kind} {path}: {message}")]
    Extraction { kind: &'static str, path: PathBuf, message: String },

    /// The embedding backend failed or answered with something unusable.
    /// `provider` names the backend (`ollama`, `openai`, `gemini`, `store`).
    #[error("Embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Save was called before any build or load.
    #[error("No index to save")]
    IndexNotBuilt,

    /// The index files exist but do not decode, or disagree with each other.
    #[error("Corrupt index at {path}: {message}")]
    CorruptIndex { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.to_string(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
