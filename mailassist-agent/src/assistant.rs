//! The per-email flow: run the agent, then turn its output into a reply.

use std::sync::Arc;

use mailassist_rag::PolicySearchTool;
use mailassist_rag::tool::truncate_chars;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::llm::{Llm, LlmRequest};
use crate::models::{EmailCategory, EmailResponse, RetrievedDoc};
use crate::postprocess::{
    Contact, DEFAULT_DEPARTMENT, classify, clean_department, clean_draft, ensure_signature,
    extract_recipient_info, extract_sender_info, extract_subject,
};
use crate::react::{AgentStep, FINAL_ANSWER, ReactAgent};
use crate::tools::{HumanEscalationTool, Tool};

const AGENT_CONFIDENCE: f32 = 0.85;
const FALLBACK_CONFIDENCE: f32 = 0.5;
const QUOTA_CONFIDENCE: f32 = 0.3;
const RETRIEVED_DOC_CHARS: usize = 300;
const DEPARTMENT_DOC_CHARS: usize = 200;
const DEPARTMENT_DOCS: usize = 2;

const QUOTA_REPLY: &str = "Subject: Re: Your Email\n\nI'm currently at my API limit for today. \
    Please try again tomorrow, or contact support if this is urgent.\n\nBest regards,\nOffice Assistant";
const FALLBACK_REPLY: &str = "Subject: Re: Your Email\n\nThank you for your email. I have received \
    your message and will respond shortly. If this is urgent, please contact your manager directly.\
    \n\nBest regards,\nOffice Assistant";

/// Generation settings shared by every model call the assistant makes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSettings {
    pub temperature: f32,
    pub max_iterations: usize,
    pub max_output_tokens: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { temperature: 0.3, max_iterations: 5, max_output_tokens: 2048 }
    }
}

/// Drafts replies to inbound emails.
///
/// Constructed once and shared; every dependency is passed in, so tests can
/// swap the model and the tools.
pub struct EmailAssistant {
    llm: Arc<dyn Llm>,
    agent: ReactAgent,
    settings: AgentSettings,
}

impl EmailAssistant {
    pub fn new(llm: Arc<dyn Llm>, tools: Vec<Arc<dyn Tool>>, settings: AgentSettings) -> Self {
        let agent = ReactAgent::new(llm.clone(), tools)
            .with_max_iterations(settings.max_iterations)
            .with_temperature(settings.temperature)
            .with_max_output_tokens(settings.max_output_tokens);
        Self { llm, agent, settings }
    }

    pub fn model_name(&self) -> &str {
        self.llm.name()
    }

    /// Draft a reply to `content` (header lines followed by the body).
    ///
    /// Never fails. A provider quota error yields [`Self::quota_response`];
    /// any other error yields [`Self::fallback_response`].
    pub async fn process_email(&self, content: &str) -> EmailResponse {
        match self.try_process(content).await {
            Ok(response) => response,
            Err(e) if e.is_quota_exhausted() => {
                warn!(error = %e, "model quota exhausted");
                Self::quota_response()
            }
            Err(e) => {
                error!(error = %e, "email processing failed");
                Self::fallback_response()
            }
        }
    }

    async fn try_process(&self, content: &str) -> Result<EmailResponse> {
        let (sender_name, sender_email) = extract_sender_info(content);
        let recipient = extract_recipient_info(content);
        let subject = extract_subject(content);
        debug!(sender = %sender_name, subject = %subject, "processing email");

        let input = format!(
            "{content}\n\n\
             ADDITIONAL CONTEXT FOR YOUR RESPONSE:\n\
             - Sender's name: {sender_name}\n\
             - Sender's email: {}\n\
             - This email was sent to: {}\n\
             - Subject: {subject}\n\
             \n\
             Please address the sender as \"{sender_name}\" in your greeting.\n",
            sender_email.as_deref().unwrap_or("unknown"),
            recipient.email.as_deref().unwrap_or("the appropriate department"),
        );

        let outcome = self.agent.run(&input).await?;
        let retrieved_docs = retrieved_docs(&outcome.steps);
        let escalated = outcome.steps.iter().any(|s| s.tool == HumanEscalationTool::NAME);
        let department = self.determine_department(content, &retrieved_docs, &recipient).await;

        info!(
            tool_calls = outcome.steps.len(),
            retrieved = retrieved_docs.len(),
            escalated,
            department = %department,
            "agent run complete"
        );

        let mut response = if !outcome.output.trim().is_empty() {
            finish_draft(&outcome.output, &department)
        } else {
            match self.generate_from_docs(&retrieved_docs, &input, &department, &sender_name).await? {
                Some(response) => response,
                None => return Ok(Self::fallback_response()),
            }
        };
        response.retrieved_docs = retrieved_docs;
        response.requires_human_review |= escalated;
        Ok(response)
    }

    /// Ask the model which department should sign the reply.
    ///
    /// Falls back to [`DEFAULT_DEPARTMENT`] when the call fails or the answer
    /// is empty.
    pub async fn determine_department(
        &self,
        content: &str,
        docs: &[RetrievedDoc],
        recipient: &Contact,
    ) -> String {
        let mut docs_context = String::new();
        if !docs.is_empty() {
            docs_context.push_str("Relevant policy documents:\n");
            for (i, doc) in docs.iter().take(DEPARTMENT_DOCS).enumerate() {
                docs_context.push_str(&format!(
                    "Document {}: {}...\n",
                    i + 1,
                    truncate_chars(&doc.result, DEPARTMENT_DOC_CHARS)
                ));
            }
        }

        let recipient_context = match (&recipient.email, &recipient.name) {
            (Some(email), Some(name)) => format!("This email was sent to: {email} ({name})"),
            (Some(email), None) => format!("This email was sent to: {email}"),
            _ => String::new(),
        };

        let prompt = format!(
            "Based on the following information, determine which department should send the response.\n\
             \n\
             Email content:\n\
             {content}\n\
             \n\
             {recipient_context}\n\
             \n\
             {docs_context}\n\
             \n\
             Return ONLY the name of the department that should sign the email (e.g., \"HR Department\", \
             \"Finance Team\", \"IT Support\", \"Benefits Team\", \"Office Assistant\", etc.).\n\
             The department name should be professional and appropriate for the context.\n\
             \n\
             Department:"
        );

        match self.llm.generate(self.request(prompt)).await {
            Ok(raw) => clean_department(&raw).unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
            Err(e) => {
                warn!(error = %e, "department selection failed");
                DEFAULT_DEPARTMENT.to_string()
            }
        }
    }

    /// Write the reply from retrieved documents when the agent gave no answer.
    /// Returns `None` when there is nothing to write from.
    async fn generate_from_docs(
        &self,
        docs: &[RetrievedDoc],
        question: &str,
        department: &str,
        sender_name: &str,
    ) -> Result<Option<EmailResponse>> {
        let info: Vec<&str> = docs.iter().map(|d| d.result.as_str()).filter(|r| !r.is_empty()).collect();
        if info.is_empty() {
            return Ok(None);
        }

        let prompt = format!(
            "Based on this employee question: \"{question}\"\n\
             \n\
             And these policy documents:\n\
             {}\n\
             \n\
             Generate a professional email reply that:\n\
             1. Starts with \"Subject: Re:\"\n\
             2. Addresses the sender as \"{sender_name}\" in the greeting\n\
             3. Answers the question using the policy information\n\
             4. Is friendly and helpful\n\
             5. Ends with this signature: \"Best regards,\n{department}\"\n\
             6. Ends with an offer to help further\n\
             \n\
             Email reply:",
            info.join("\n")
        );

        info!("agent produced no answer, drafting from retrieved documents");
        let text = self.llm.generate(self.request(prompt)).await?;
        Ok(Some(finish_draft(&text, department)))
    }

    fn request(&self, prompt: String) -> LlmRequest {
        LlmRequest::new(prompt)
            .with_temperature(self.settings.temperature)
            .with_max_output_tokens(self.settings.max_output_tokens)
    }

    /// Reply used when the model provider's quota is exhausted.
    pub fn quota_response() -> EmailResponse {
        EmailResponse {
            draft_reply: QUOTA_REPLY.to_string(),
            category: EmailCategory::GeneralInquiry,
            retrieved_docs: Vec::new(),
            confidence_score: QUOTA_CONFIDENCE,
            requires_human_review: true,
            clarification_needed: false,
            clarification_question: None,
        }
    }

    /// Reply used when anything else goes wrong.
    pub fn fallback_response() -> EmailResponse {
        EmailResponse {
            draft_reply: FALLBACK_REPLY.to_string(),
            category: EmailCategory::GeneralInquiry,
            retrieved_docs: Vec::new(),
            confidence_score: FALLBACK_CONFIDENCE,
            requires_human_review: false,
            clarification_needed: false,
            clarification_question: None,
        }
    }
}

/// Policy-search observations, truncated, in call order.
fn retrieved_docs(steps: &[AgentStep]) -> Vec<RetrievedDoc> {
    steps
        .iter()
        .filter(|s| s.tool == PolicySearchTool::NAME && !s.observation.is_empty())
        .map(|s| RetrievedDoc {
            tool: PolicySearchTool::NAME.to_string(),
            result: truncate_chars(&s.observation, RETRIEVED_DOC_CHARS).to_string(),
        })
        .collect()
}

/// Turn raw model output into a finished reply.
fn finish_draft(output: &str, department: &str) -> EmailResponse {
    let text = match output.rfind(FINAL_ANSWER) {
        Some(idx) => output[idx + FINAL_ANSWER.len()..].trim(),
        None => output,
    };
    let draft = clean_draft(text);
    let category = classify(&draft);

    EmailResponse {
        draft_reply: ensure_signature(&draft, department),
        category,
        retrieved_docs: Vec::new(),
        confidence_score: AGENT_CONFIDENCE,
        requires_human_review: false,
        clarification_needed: false,
        clarification_question: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_drafts_are_well_formed() {
        for response in [EmailAssistant::quota_response(), EmailAssistant::fallback_response()] {
            assert!(response.draft_reply.starts_with("Subject: Re: Your Email\n\n"));
            assert!(response.draft_reply.ends_with("Best regards,\nOffice Assistant"));
        }
        assert!(FALLBACK_REPLY.contains("respond shortly. If this is urgent"));
        assert!(!FALLBACK_REPLY.contains("directly.  "));
    }

    #[test]
    fn only_policy_search_steps_count_as_retrieved() {
        let step = |tool: &str, observation: &str| AgentStep {
            tool: tool.into(),
            tool_input: "q".into(),
            observation: observation.into(),
            log: String::new(),
        };
        let docs = retrieved_docs(&[
            step("PolicySearch", &"x".repeat(400)),
            step("CheckSensitivity", "safe"),
            step("PolicySearch", ""),
        ]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].result.len(), 300);
    }

    #[test]
    fn finished_draft_has_subject_category_and_signature() {
        let response = finish_draft("Dear Jane,\nYou get 10 sick days.\n\nThanks,\n[Your Name]", "HR Department");
        assert_eq!(
            response.draft_reply,
            "Subject: Re: Your Email\n\nDear Jane,\nYou get 10 sick days.\n\nBest regards,\nHR Department"
        );
        assert_eq!(response.category, EmailCategory::PolicyQuery);
        assert_eq!(response.confidence_score, 0.85);
    }
}
