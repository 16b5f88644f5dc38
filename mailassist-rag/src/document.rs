//! Data types for documents, chunks, and search results.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The office formats the loader understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
}

impl DocumentType {
    /// Map a file extension (without the dot, any case) to a document type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a document came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// File name of the source document.
    pub source: String,
    /// Format the text was extracted from.
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    /// Full path the document was read from.
    pub path: PathBuf,
}

/// Raw text extracted from a source file.
///
/// Documents only live between loading and chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The extracted text content.
    pub text: String,
    /// Source information carried into every chunk.
    pub metadata: DocumentMetadata,
}

/// Metadata attached to a [`Chunk`]: the parent document's metadata plus
/// the chunk's position within it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub path: PathBuf,
    /// Zero-based position of this chunk within its document.
    pub chunk_index: usize,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
}

/// A bounded segment of a [`Document`]'s text, the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Identifier of the form `{source}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Similarity derived from the L2 distance as `1 / (1 + d)`, in `(0, 1]`.
    pub score: f32,
}
