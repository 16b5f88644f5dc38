//! # mailassist-agent
//!
//! Drafts replies to inbound emails.
//!
//! An [`EmailAssistant`] runs a [`ReactAgent`] over the email, letting the
//! model consult company policy through [`PolicySearchTool`] and the other
//! [`tools`], asks the model which department should sign, and cleans the
//! result up with the [`postprocess`] functions. The model sits behind the
//! [`Llm`] trait: [`GeminiClient`] in production, [`MockLlm`] in tests.
//!
//! [`PolicySearchTool`]: mailassist_rag::PolicySearchTool

pub mod assistant;
pub mod error;
pub mod gemini;
pub mod llm;
pub mod mock;
pub mod models;
pub mod postprocess;
pub mod react;
pub mod tools;

pub use assistant::{AgentSettings, EmailAssistant};
pub use error::{AgentError, LlmError, Result};
pub use gemini::GeminiClient;
pub use llm::{Llm, LlmRequest};
pub use mock::MockLlm;
pub use models::{EmailCategory, EmailInput, EmailResponse, IngestResponse, RetrievedDoc};
pub use react::{AgentOutcome, AgentStep, ReactAgent};
pub use tools::{CheckSensitivityTool, DraftEmailTool, HumanEscalationTool, Tool, default_tools};
