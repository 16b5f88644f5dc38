//! Tools the ReAct agent can call.
//!
//! Every tool takes a single free-text input and returns a free-text
//! observation. Tools never fail; problems are reported in the observation.

use std::sync::Arc;

use async_trait::async_trait;
use mailassist_rag::{PolicySearchTool, SimilaritySearch};

/// A named action available to the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Shown to the model in the prompt's tool list.
    fn description(&self) -> &str;

    async fn execute(&self, input: &str) -> String;
}

#[async_trait]
impl Tool for PolicySearchTool {
    fn name(&self) -> &str {
        PolicySearchTool::NAME
    }

    fn description(&self) -> &str {
        PolicySearchTool::DESCRIPTION
    }

    async fn execute(&self, input: &str) -> String {
        self.run(input).await
    }
}

/// Flags a message for human review.
pub struct HumanEscalationTool;

impl HumanEscalationTool {
    pub const NAME: &'static str = "HumanEscalation";
}

#[async_trait]
impl Tool for HumanEscalationTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Escalate sensitive, confidential, or complex matters to human review. Use this for HR \
         issues, legal matters, complaints, or unclear requests. Input should be the reason for \
         escalation."
    }

    async fn execute(&self, input: &str) -> String {
        format!("ESCALATION REQUIRED - Human Review Needed: {input}")
    }
}

/// Echoes the key points of a reply back to the agent as a draft marker.
pub struct DraftEmailTool {
    tone: String,
}

impl DraftEmailTool {
    pub const NAME: &'static str = "DraftEmail";

    pub fn new() -> Self {
        Self { tone: "professional".to_string() }
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }
}

impl Default for DraftEmailTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DraftEmailTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Draft a professional email based on context and tone. Use this to generate the actual \
         email response. Input should include the key points to address in the reply."
    }

    async fn execute(&self, input: &str) -> String {
        format!("DRAFT EMAIL based on: {input} (Tone: {})", self.tone)
    }
}

/// Keywords that mark an email as an HR or legal matter, checked in order.
pub const SENSITIVE_KEYWORDS: &[&str] = &[
    "harassment",
    "discrimination",
    "complaint",
    "legal",
    "lawsuit",
    "hr issue",
    "termination",
    "fire",
    "fired",
    "sexual",
    "harass",
    "bullying",
    "unfair",
    "attorney",
    "lawyer",
    "court",
];

/// Keyword scan for content that needs escalation.
pub struct CheckSensitivityTool;

impl CheckSensitivityTool {
    pub const NAME: &'static str = "CheckSensitivity";

    /// The first sensitive keyword contained in `content`, ignoring case.
    pub fn find_keyword(content: &str) -> Option<&'static str> {
        let lower = content.to_lowercase();
        SENSITIVE_KEYWORDS.iter().copied().find(|kw| lower.contains(kw))
    }
}

#[async_trait]
impl Tool for CheckSensitivityTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Check if email content contains sensitive information that requires escalation. Returns \
         'sensitive' if HR/legal issues detected, 'safe' otherwise."
    }

    async fn execute(&self, input: &str) -> String {
        match Self::find_keyword(input) {
            Some(kw) => format!("sensitive - contains keyword: {kw}"),
            None => "safe".to_string(),
        }
    }
}

/// The standard tool set. Policy search returns `top_k` hits per query.
pub fn default_tools(store: Arc<dyn SimilaritySearch>, top_k: usize) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(PolicySearchTool::new(store).with_top_k(top_k)),
        Arc::new(HumanEscalationTool),
        Arc::new(DraftEmailTool::new()),
        Arc::new(CheckSensitivityTool),
    ]
}
