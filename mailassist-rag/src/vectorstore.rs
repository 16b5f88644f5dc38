//! The vector store: embedded chunks behind a flat L2 index.
//!
//! Queries read an immutable [`IndexSnapshot`]. [`VectorStore::build`] and
//! [`VectorStore::load`] assemble a complete new snapshot first and only then
//! swap it in, so a rebuild never exposes a half-built index to readers.
//!
//! # Persistence
//!
//! A store saved at `path` occupies two sibling files:
//!
//! - `<path>.index`: dimensions and vectors, `bincode` encoded
//! - `<path>.chunks.json`: the position-aligned chunk list

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::{EmbeddingProvider, ensure_dimensions};
use crate::error::{RagError, Result};
use crate::index::{FlatL2Index, distance_to_similarity};

const INDEX_SUFFIX: &str = ".index";
const CHUNKS_SUFFIX: &str = ".chunks.json";

/// Read-only similarity search over indexed chunks.
///
/// Consumers such as the policy search tool depend on this trait rather than
/// on [`VectorStore`] directly.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return up to `k` chunks nearest to `query`, most similar first.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>>;
}

/// An index together with the chunks it was built from, aligned by position.
#[derive(Debug)]
pub struct IndexSnapshot {
    index: FlatL2Index,
    chunks: Vec<Chunk>,
}

impl IndexSnapshot {
    fn new(index: FlatL2Index, chunks: Vec<Chunk>) -> Result<Self> {
        if index.len() != chunks.len() {
            return Err(RagError::Pipeline(format!(
                "index holds {} vectors but {} chunks were supplied",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { index, chunks })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Embeds chunks, keeps them searchable and persists them to disk.
pub struct VectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    snapshot: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl VectorStore {
    /// Create an empty store. Nothing is searchable until
    /// [`build`](Self::build) or [`load`](Self::load) succeeds.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, snapshot: RwLock::new(None) }
    }

    /// Dimensionality fixed by the embedding provider.
    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// The snapshot queries currently read, if any.
    pub async fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.snapshot.read().await.clone()
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> usize {
        self.snapshot().await.map(|s| s.len()).unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Embed all chunk texts in one batch and replace the current index.
    ///
    /// Returns the number of indexed chunks. On error the previous index stays
    /// in place.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<usize> {
        let dimensions = self.dimensions();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let vectors = if texts.is_empty() { Vec::new() } else { self.embedder.embed_batch(&texts).await? };
        if vectors.len() != chunks.len() {
            return Err(RagError::embedding(
                "store",
                format!("expected {} embeddings, got {}", chunks.len(), vectors.len()),
            ));
        }
        ensure_dimensions(&vectors, dimensions)?;

        let mut index = FlatL2Index::new(dimensions);
        index.add(&vectors)?;
        let snapshot = IndexSnapshot::new(index, chunks)?;
        let count = snapshot.len();

        *self.snapshot.write().await = Some(Arc::new(snapshot));
        info!(chunk_count = count, dimensions, "built vector index");
        Ok(count)
    }

    /// Persist the current index and chunk list next to `path`.
    ///
    /// # Errors
    ///
    /// [`RagError::IndexNotBuilt`] when nothing has been built or loaded.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot().await.ok_or(RagError::IndexNotBuilt)?;

        let index_bytes = bincode::serialize(&snapshot.index)
            .map_err(|e| RagError::Pipeline(format!("failed to encode index: {e}")))?;
        let chunk_bytes = serde_json::to_vec(&snapshot.chunks)
            .map_err(|e| RagError::Pipeline(format!("failed to encode chunks: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(&index_path(path), &index_bytes).await?;
        write_atomic(&chunks_path(path), &chunk_bytes).await?;

        info!(path = %path.display(), chunk_count = snapshot.len(), "saved vector index");
        Ok(())
    }

    /// Restore an index saved with [`save`](Self::save).
    ///
    /// Returns `Ok(false)` if either file is missing, leaving the store as it
    /// was.
    ///
    /// # Errors
    ///
    /// [`RagError::CorruptIndex`] when the files exist but cannot be decoded,
    /// disagree in length, or were built with another dimensionality.
    pub async fn load(&self, path: &Path) -> Result<bool> {
        let index_file = index_path(path);
        let chunks_file = chunks_path(path);
        if !tokio::fs::try_exists(&index_file).await? || !tokio::fs::try_exists(&chunks_file).await? {
            debug!(path = %path.display(), "no saved index found");
            return Ok(false);
        }

        let corrupt = |file: &Path, message: String| RagError::CorruptIndex { path: file.to_path_buf(), message };

        let index_bytes = tokio::fs::read(&index_file).await?;
        let index: FlatL2Index =
            bincode::deserialize(&index_bytes).map_err(|e| corrupt(&index_file, e.to_string()))?;
        index.validate().map_err(|m| corrupt(&index_file, m))?;
        if index.dimensions() != self.dimensions() {
            return Err(corrupt(
                &index_file,
                format!(
                    "index has {} dimensions but the embedding provider produces {}",
                    index.dimensions(),
                    self.dimensions()
                ),
            ));
        }

        let chunk_bytes = tokio::fs::read(&chunks_file).await?;
        let chunks: Vec<Chunk> =
            serde_json::from_slice(&chunk_bytes).map_err(|e| corrupt(&chunks_file, e.to_string()))?;

        let snapshot = IndexSnapshot::new(index, chunks).map_err(|e| corrupt(&chunks_file, e.to_string()))?;
        let count = snapshot.len();
        *self.snapshot.write().await = Some(Arc::new(snapshot));

        info!(path = %path.display(), chunk_count = count, "loaded vector index");
        Ok(true)
    }

    /// Return the `k` chunks nearest to `query`, most similar first.
    ///
    /// An unbuilt store or `k == 0` yields an empty result without calling the
    /// embedder.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let Some(snapshot) = self.snapshot().await else {
            return Ok(Vec::new());
        };
        if k == 0 || snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let neighbors = snapshot.index.search(&embedding, k)?;

        debug!(k, hits = neighbors.len(), "similarity search");
        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                snapshot.chunks.get(n.position).map(|chunk| SearchResult {
                    chunk: chunk.clone(),
                    score: distance_to_similarity(n.distance),
                })
            })
            .collect())
    }
}

#[async_trait]
impl SimilaritySearch for VectorStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        VectorStore::similarity_search(self, query, k).await
    }
}

/// `<path>.index`
pub fn index_path(path: &Path) -> PathBuf {
    with_suffix(path, INDEX_SUFFIX)
}

/// `<path>.chunks.json`
pub fn chunks_path(path: &Path) -> PathBuf {
    with_suffix(path, CHUNKS_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = with_suffix(target, ".tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, target).await?;
    Ok(())
}
