//! Ingestion pipeline orchestrator.
//!
//! The [`IngestionPipeline`] runs the full load → chunk → embed → index →
//! save workflow over one documents directory and summarises the outcome in
//! an [`IngestReport`]. Runs are serialised: a second run waits for the first.
//!
//! # Example
//!
//! ```rust,ignore
//! use mailassist_rag::{IngestionPipeline, RecursiveChunker, VectorStore};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .store(Arc::new(VectorStore::new(embedder)))
//!     .chunker(Arc::new(RecursiveChunker::new(500, 50)))
//!     .documents_dir("documents")
//!     .index_path("faiss_index")
//!     .build()?;
//!
//! let report = pipeline.run().await;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::chunking::Chunker;
use crate::error::{RagError, Result};
use crate::loader::{DocumentLoader, LoadReport};
use crate::vectorstore::VectorStore;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// `success` or `error`.
    pub status: String,
    pub documents_processed: usize,
    pub chunks_created: usize,
    /// Files that could not be extracted, as `<file>: <error>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<String>,
    pub message: String,
}

impl IngestReport {
    pub const SUCCESS: &'static str = "success";
    pub const ERROR: &'static str = "error";

    fn error(message: impl Into<String>, failed_files: Vec<String>) -> Self {
        Self {
            status: Self::ERROR.to_string(),
            documents_processed: 0,
            chunks_created: 0,
            failed_files,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Self::SUCCESS
    }
}

/// Loads, chunks, indexes and persists a documents directory.
pub struct IngestionPipeline {
    loader: DocumentLoader,
    chunker: Arc<dyn Chunker>,
    store: Arc<VectorStore>,
    documents_dir: PathBuf,
    index_path: PathBuf,
    running: Mutex<()>,
}

impl IngestionPipeline {
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Run one ingestion. Never fails; problems are reported with status `error`.
    pub async fn run(&self) -> IngestReport {
        let _guard = self.running.lock().await;
        info!(directory = %self.documents_dir.display(), "ingestion started");

        match self.ingest().await {
            Ok(report) => {
                info!(
                    documents = report.documents_processed,
                    chunk_count = report.chunks_created,
                    failures = report.failed_files.len(),
                    "ingestion finished"
                );
                report
            }
            Err(e) => {
                error!(error = %e, "ingestion failed");
                IngestReport::error(e.to_string(), Vec::new())
            }
        }
    }

    async fn ingest(&self) -> Result<IngestReport> {
        let loader = self.loader;
        let dir = self.documents_dir.clone();
        let LoadReport { documents, failures } =
            tokio::task::spawn_blocking(move || loader.load_documents(&dir))
                .await
                .map_err(|e| RagError::Pipeline(format!("document loading task failed: {e}")))??;

        let failed_files: Vec<String> = failures.iter().map(|e| e.to_string()).collect();
        if documents.is_empty() {
            return Ok(IngestReport::error("No documents found in the documents directory", failed_files));
        }

        let chunks = self.chunker.chunk_documents(&documents);
        let chunks_created = self.store.build(chunks).await?;
        self.store.save(&self.index_path).await?;

        Ok(IngestReport {
            status: IngestReport::SUCCESS.to_string(),
            documents_processed: documents.len(),
            chunks_created,
            failed_files,
            message: format!("Successfully processed {} documents", documents.len()),
        })
    }
}

/// Builder for an [`IngestionPipeline`]. Every field is required.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    chunker: Option<Arc<dyn Chunker>>,
    store: Option<Arc<VectorStore>>,
    documents_dir: Option<PathBuf>,
    index_path: Option<PathBuf>,
}

impl IngestionPipelineBuilder {
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    pub fn store(mut self, store: Arc<VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn documents_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.documents_dir = Some(dir.into());
        self
    }

    /// Path prefix for the two persisted index files.
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any field is missing.
    pub fn build(self) -> Result<IngestionPipeline> {
        let missing = |field: &str| RagError::Config(format!("{field} is required"));
        Ok(IngestionPipeline {
            loader: DocumentLoader::new(),
            chunker: self.chunker.ok_or_else(|| missing("chunker"))?,
            store: self.store.ok_or_else(|| missing("store"))?,
            documents_dir: self.documents_dir.ok_or_else(|| missing("documents_dir"))?,
            index_path: self.index_path.ok_or_else(|| missing("index_path"))?,
            running: Mutex::new(()),
        })
    }
}
