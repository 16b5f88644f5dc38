//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text hierarchically by a priority list of separators: paragraph
//! breaks first, then line breaks, sentence punctuation, commas, spaces and
//! finally single characters. Finer separators are only used where a piece is
//! still too long, and consecutive chunks share up to `chunk_overlap`
//! characters.
//!
//! All sizes are measured in characters (Unicode scalar values), never bytes.

use std::collections::VecDeque;

use crate::config::RagConfig;
use crate::document::{Chunk, ChunkMetadata, Document};

/// Separators tried in order, coarsest first. The empty separator splits into
/// single characters and always terminates the recursion.
pub const DEFAULT_SEPARATORS: [&str; 8] = ["\n\n", "\n", ".", "!", "?", ",", " ", ""];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Split every document, keeping document order.
    fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunk(document)).collect()
    }
}

/// Splits text hierarchically by a list of separators with overlap.
///
/// # Example
///
/// ```rust
/// use mailassist_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(20, 5);
/// let chunks = chunker.split_text("First paragraph here.\n\nSecond one.");
/// assert!(chunks.iter().all(|c| c.chars().count() <= 20));
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with [`DEFAULT_SEPARATORS`].
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: maximum number of characters carried over between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a chunker from a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator priority list.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// Split raw text into trimmed, non-empty chunks of at most `chunk_size` characters.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }
            if !short_pieces.is_empty() {
                chunks.extend(self.merge_pieces(&short_pieces));
                short_pieces.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge_pieces(&short_pieces));
        }

        chunks
    }

    /// Greedily merge short pieces into chunks, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_window(&window) {
                    merged.push(chunk);
                }
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_window(&window) {
            merged.push(chunk);
        }
        merged
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let texts = self.split_text(&document.text);
        let chunk_count = texts.len();

        texts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| Chunk {
                id: format!("{}_{chunk_index}", document.metadata.source),
                text,
                metadata: ChunkMetadata {
                    source: document.metadata.source.clone(),
                    doc_type: document.metadata.doc_type,
                    path: document.metadata.path.clone(),
                    chunk_index,
                    chunk_count,
                },
            })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split text at every occurrence of `separator`, attaching the separator to
/// the start of the piece that follows it. The empty separator yields single
/// characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::document::{DocumentMetadata, DocumentType};

    fn document(text: &str) -> Document {
        Document {
            text: text.to_string(),
            metadata: DocumentMetadata {
                source: "handbook.pdf".to_string(),
                doc_type: DocumentType::Pdf,
                path: PathBuf::from("documents/handbook.pdf"),
            },
        }
    }

    #[test]
    fn separator_stays_with_following_piece() {
        assert_eq!(split_keeping_separator("a.b.c", "."), vec!["a", ".b", ".c"]);
        assert_eq!(split_keeping_separator(".a..b", "."), vec![".a", ".", ".b"]);
        assert_eq!(split_keeping_separator("héllo", ""), vec!["h", "é", "l", "l", "o"]);
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunker = RecursiveChunker::new(100, 10);
        assert_eq!(chunker.split_text("  Sick leave policy.  \n"), vec!["Sick leave policy."]);
    }

    #[test]
    fn whitespace_only_text_produces_no_chunks() {
        let chunker = RecursiveChunker::new(100, 10);
        assert!(chunker.split_text(" \n\n \n").is_empty());
        assert!(chunker.chunk(&document("")).is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_over_finer_separators() {
        let chunker = RecursiveChunker::new(30, 0);
        let text = "Annual leave is 25 days.\n\nSick leave is 10 days.";
        assert_eq!(
            chunker.split_text(text),
            vec!["Annual leave is 25 days.", "Sick leave is 10 days."]
        );
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let chunker = RecursiveChunker::new(11, 5);
        let chunks = chunker.split_text("aa bb cc dd ee ff");
        assert_eq!(chunks, vec!["aa bb cc dd", "dd ee ff"]);
    }

    #[test]
    fn long_words_fall_back_to_characters() {
        let chunker = RecursiveChunker::new(4, 0);
        let chunks = chunker.split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() {
        let chunker = RecursiveChunker::new(5, 0);
        let chunks = chunker.split_text("ééééééé");
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks.concat(), "ééééééé");
    }

    #[test]
    fn chunks_carry_document_metadata_and_position() {
        let chunker = RecursiveChunker::new(30, 0);
        let chunks = chunker.chunk(&document("Annual leave is 25 days.\n\nSick leave is 10 days."));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].id, "handbook.pdf_1");
        assert_eq!(chunks[1].metadata.chunk_index, 1);
        assert_eq!(chunks[1].metadata.chunk_count, 2);
        assert_eq!(chunks[1].metadata.doc_type, DocumentType::Pdf);
        assert_eq!(chunks[1].metadata.path, PathBuf::from("documents/handbook.pdf"));
    }
}
