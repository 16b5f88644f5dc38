//! Request and response types shared with the HTTP layer.

use serde::{Deserialize, Serialize};

/// Coarse intent of an email.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EmailCategory {
    PolicyQuery,
    GeneralInquiry,
    SensitiveMatter,
    ClarificationNeeded,
    HumanEscalation,
}

/// An inbound email as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailInput {
    pub subject: String,
    pub body: String,
    pub sender: String,
    #[serde(default)]
    pub recipient: Option<String>,
}

impl EmailInput {
    /// Render as header-style text for the assistant.
    ///
    /// The `To:` line is only present when a recipient was given.
    pub fn to_content(&self) -> String {
        let mut content = format!("Subject: {}\nFrom: {}\n", self.subject, self.sender);
        if let Some(recipient) = self.recipient.as_deref().filter(|r| !r.trim().is_empty()) {
            content.push_str(&format!("To: {recipient}\n"));
        }
        content.push('\n');
        content.push_str(&self.body);
        content
    }
}

/// A policy-search observation kept as evidence for the reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrievedDoc {
    pub tool: String,
    pub result: String,
}

/// The drafted reply and how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailResponse {
    pub draft_reply: String,
    pub category: EmailCategory,
    #[serde(default)]
    pub retrieved_docs: Vec<RetrievedDoc>,
    /// In `[0, 1]`.
    pub confidence_score: f32,
    #[serde(default)]
    pub requires_human_review: bool,
    #[serde(default)]
    pub clarification_needed: bool,
    #[serde(default)]
    pub clarification_question: Option<String>,
}

/// Acknowledgement returned by the ingestion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestResponse {
    pub status: String,
    pub documents_processed: usize,
    pub chunks_created: usize,
    pub message: String,
}

impl IngestResponse {
    pub fn started() -> Self {
        Self {
            status: "started".to_string(),
            documents_processed: 0,
            chunks_created: 0,
            message: "Ingestion started in background.".to_string(),
        }
    }
}
