//! Scripted [`Llm`] for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{Llm, LlmRequest};

/// A [`Llm`] that replays scripted answers and records every request.
///
/// Prompts containing a rule's marker get that rule's answer. All other
/// prompts consume the queued responses in order; once the queue is empty the
/// fallback answer is used, or [`LlmError::EmptyResponse`] if there is none.
///
/// ```rust
/// # tokio_test_block(async {
/// use mailassist_agent::{Llm, LlmRequest, MockLlm};
///
/// let llm = MockLlm::new("mock")
///     .with_rule("Department:", "HR Department")
///     .with_response("Final Answer: hello");
/// assert_eq!(llm.generate(LlmRequest::new("...Department:")).await.unwrap(), "HR Department");
/// assert_eq!(llm.generate(LlmRequest::new("Question")).await.unwrap(), "Final Answer: hello");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
pub struct MockLlm {
    name: String,
    rules: Vec<(String, String)>,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful answer.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        lock(&self.responses).push_back(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: LlmError) -> Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    /// Answer every prompt containing `marker` with `text`.
    pub fn with_rule(mut self, marker: impl Into<String>, text: impl Into<String>) -> Self {
        self.rules.push((marker.into(), text.into()));
        self
    }

    /// Answer used once the queue is drained.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: LlmRequest) -> Result<String, LlmError> {
        let rule = self
            .rules
            .iter()
            .find(|(marker, _)| request.prompt.contains(marker.as_str()))
            .map(|(_, text)| text.clone());
        lock(&self.requests).push(request);

        if let Some(text) = rule {
            return Ok(text);
        }
        let queued = lock(&self.responses).pop_front();
        match queued {
            Some(response) => response,
            None => self.fallback.clone().ok_or(LlmError::EmptyResponse),
        }
    }
}
