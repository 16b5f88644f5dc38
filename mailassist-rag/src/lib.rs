//! # mailassist-rag
//!
//! Document retrieval for the mailassist email assistant.
//!
//! - [`DocumentLoader`] extracts text from PDF and DOCX files
//! - [`RecursiveChunker`] splits it into overlapping chunks
//! - an [`EmbeddingProvider`] turns chunks into vectors
//!   ([`OllamaEmbeddingProvider`], [`OpenAIEmbeddingProvider`], [`GeminiEmbeddingProvider`])
//! - [`VectorStore`] indexes them in a [`FlatL2Index`] and persists both to disk
//! - [`IngestionPipeline`] runs the whole workflow over a directory
//! - [`PolicySearchTool`] exposes similarity search to an agent loop

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod gemini;
pub mod index;
pub mod loader;
pub mod ollama;
pub mod openai;
pub mod pipeline;
pub mod tool;
pub mod vectorstore;

pub use chunking::{Chunker, DEFAULT_SEPARATORS, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, ChunkMetadata, Document, DocumentMetadata, DocumentType, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use gemini::GeminiEmbeddingProvider;
pub use index::{FlatL2Index, Neighbor};
pub use loader::{DocumentLoader, LoadReport};
pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAIEmbeddingProvider;
pub use pipeline::{IngestReport, IngestionPipeline, IngestionPipelineBuilder};
pub use tool::PolicySearchTool;
pub use vectorstore::{IndexSnapshot, SimilaritySearch, VectorStore};
