//! Policy search: similarity search rendered as text for an agent loop.
//!
//! The [`PolicySearchTool`] never fails. Store errors come back as a
//! readable observation so the reasoning loop can carry on.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mailassist_rag::{PolicySearchTool, VectorStore};
//!
//! let store = Arc::new(VectorStore::new(embedder));
//! let tool = PolicySearchTool::new(store);
//! let observation = tool.run("How many sick days do I get?").await;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::document::SearchResult;
use crate::vectorstore::SimilaritySearch;

/// Observation returned when nothing matches.
pub const NO_RESULTS: &str = "No relevant policy documents found in the company database.";

const DEFAULT_TOP_K: usize = 3;
const CONTENT_PREVIEW_CHARS: usize = 500;
const RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// Searches the company policy index and formats the hits.
pub struct PolicySearchTool {
    store: Arc<dyn SimilaritySearch>,
    top_k: usize,
}

impl PolicySearchTool {
    /// Name the agent uses to invoke this tool.
    pub const NAME: &'static str = "PolicySearch";

    pub const DESCRIPTION: &'static str = "Search company policies, SOPs, and internal documents. \
        Use this for any policy-related, rule-based, or procedure questions. Input should be a \
        specific question or search query.";

    pub fn new(store: Arc<dyn SimilaritySearch>) -> Self {
        Self { store, top_k: DEFAULT_TOP_K }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Search for `query` and render the hits as one observation string.
    pub async fn run(&self, query: &str) -> String {
        info!(query, top_k = self.top_k, "policy search");
        match self.store.similarity_search(query, self.top_k).await {
            Ok(results) if results.is_empty() => NO_RESULTS.to_string(),
            Ok(results) => format_results(&results),
            Err(e) => {
                error!(error = %e, "policy search failed");
                format!("Error searching policies: {e}")
            }
        }
    }
}

/// Render hits as `[Document: .., Relevance: ..]` blocks.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "[Document: {}, Relevance: {:.2}]\nContent: {}...",
                r.chunk.metadata.source,
                r.score,
                truncate_chars(&r.chunk.text, CONTENT_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}

/// The first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn description_steers_policy_and_procedure_questions_here() {
        assert!(PolicySearchTool::DESCRIPTION.starts_with("Search company policies, SOPs, and internal documents."));
        assert!(PolicySearchTool::DESCRIPTION.contains("rule-based, or procedure questions"));
    }
}
