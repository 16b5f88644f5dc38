//! The embedding seam between chunk text and the vector index.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// Turns text into fixed-length vectors.
///
/// Every vector a provider returns has [`dimensions`](Self::dimensions)
/// components; the store rejects anything else. Backends with a native batch
/// endpoint override [`embed_batch`](Self::embed_batch), which otherwise
/// embeds one text at a time.
///
/// ```rust,ignore
/// use mailassist_rag::{EmbeddingProvider, OllamaEmbeddingProvider};
///
/// let provider = OllamaEmbeddingProvider::default();
/// let vector = provider.embed("How many sick days do I get?").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize;
}

/// Fail with [`RagError::DimensionMismatch`] on the first vector whose length
/// is not `expected`.
pub fn ensure_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(bad) => Err(RagError::DimensionMismatch { expected, actual: bad.len() }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_first_offending_length() {
        let err = ensure_dimensions(&[vec![0.0; 3], vec![0.0; 2], vec![0.0; 5]], 3).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
        assert!(ensure_dimensions(&[], 7).is_ok());
    }
}
