//! A text-protocol ReAct agent.
//!
//! The model is prompted to alternate `Thought:` / `Action:` / `Action Input:`
//! lines. Generation stops before `Observation`, the named tool runs, and its
//! output is fed back as the observation. The loop ends when the model writes
//! `Final Answer:` or the iteration budget is spent, in which case one last
//! call asks for the answer from the steps so far.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::llm::{Llm, LlmRequest};
use crate::tools::Tool;

pub const FINAL_ANSWER: &str = "Final Answer:";
pub const STOP_SEQUENCE: &str = "\nObservation";
pub const MISSING_ACTION: &str = "Invalid Format: Missing 'Action:' after 'Thought:'";
pub const MISSING_ACTION_INPUT: &str = "Invalid Format: Missing 'Action Input:' after 'Action:'";

/// Tool name recorded for steps whose model output could not be parsed.
pub const PARSE_ERROR_TOOL: &str = "_Exception";

const FORCE_FINAL: &str = "\n\nI now need to return a final answer based on the previous steps:";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("static regex")
});
static ACTION_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action\s*\d*\s*:").expect("static regex"));

/// One tool invocation made by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub tool: String,
    pub tool_input: String,
    pub observation: String,
    /// Raw model text that produced this step.
    #[serde(skip)]
    pub log: String,
}

/// Final output of a run plus every intermediate step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutcome {
    pub output: String,
    pub steps: Vec<AgentStep>,
}

/// What a single model turn asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    Finish(String),
    Action { tool: String, input: String },
    Invalid(&'static str),
}

/// Interpret one model turn. A final answer wins over an action.
pub fn parse_output(text: &str) -> ParsedOutput {
    if let Some(idx) = text.rfind(FINAL_ANSWER) {
        return ParsedOutput::Finish(text[idx + FINAL_ANSWER.len()..].trim().to_string());
    }
    if let Some(caps) = ACTION_RE.captures(text) {
        let tool = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default().to_string();
        let input = caps.get(2).map(|m| m.as_str().trim().trim_matches('"')).unwrap_or_default();
        return ParsedOutput::Action { tool, input: input.to_string() };
    }
    if ACTION_ONLY_RE.is_match(text) {
        ParsedOutput::Invalid(MISSING_ACTION_INPUT)
    } else {
        ParsedOutput::Invalid(MISSING_ACTION)
    }
}

/// Runs the ReAct protocol over a set of [`Tool`]s.
pub struct ReactAgent {
    llm: Arc<dyn Llm>,
    tools: Vec<Arc<dyn Tool>>,
    max_iterations: usize,
    temperature: f32,
    max_output_tokens: u32,
}

impl ReactAgent {
    pub fn new(llm: Arc<dyn Llm>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { llm, tools, max_iterations: 5, temperature: 0.3, max_output_tokens: 2048 }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Answer `input`, calling tools as the model asks.
    pub async fn run(&self, input: &str) -> Result<AgentOutcome, LlmError> {
        let mut steps: Vec<AgentStep> = Vec::new();

        for iteration in 0..self.max_iterations {
            let text = self.complete(input, &scratchpad(&steps)).await?;

            match parse_output(&text) {
                ParsedOutput::Finish(output) => {
                    info!(iterations = iteration + 1, tool_calls = steps.len(), "agent finished");
                    return Ok(AgentOutcome { output, steps });
                }
                ParsedOutput::Action { tool, input: tool_input } => {
                    debug!(iteration, tool = %tool, tool_input = %tool_input, "agent action");
                    let observation = self.invoke(&tool, &tool_input).await;
                    steps.push(AgentStep { tool, tool_input, observation, log: text });
                }
                ParsedOutput::Invalid(message) => {
                    warn!(iteration, "could not parse agent output");
                    steps.push(AgentStep {
                        tool: PARSE_ERROR_TOOL.to_string(),
                        tool_input: text.clone(),
                        observation: message.to_string(),
                        log: text,
                    });
                }
            }
        }

        info!(max_iterations = self.max_iterations, "iteration budget spent, forcing final answer");
        let mut pad = scratchpad(&steps);
        pad.push_str(FORCE_FINAL);
        let text = self.complete(input, &pad).await?;
        let output = match parse_output(&text) {
            ParsedOutput::Finish(output) => output,
            _ => text,
        };
        Ok(AgentOutcome { output, steps })
    }

    async fn complete(&self, input: &str, scratchpad: &str) -> Result<String, LlmError> {
        let request = LlmRequest::new(self.prompt(input, scratchpad))
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens)
            .with_stop(STOP_SEQUENCE);
        self.llm.generate(request).await
    }

    async fn invoke(&self, name: &str, input: &str) -> String {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.execute(input).await,
            None => format!("{name} is not a valid tool, try one of [{}].", self.tool_names().join(", ")),
        }
    }

    fn prompt(&self, input: &str, scratchpad: &str) -> String {
        let tools = self
            .tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names = self.tool_names().join(", ");

        format!(
            "You are an Intelligent Office Email Assistant. You have access to the following tools:\n\
             \n\
             {tools}\n\
             \n\
             IMPORTANT GUIDELINES:\n\
             1. Use PolicySearch to find information from company documents\n\
             2. One or two tool calls are enough for most questions\n\
             3. As soon as you have the information, give the final answer\n\
             4. Do not repeat a tool call you have already made\n\
             5. If the information is not found, say so politely and suggest alternatives\n\
             \n\
             Use this format:\n\
             \n\
             Question: the input question you must answer\n\
             Thought: what information do I need and which tool should I use?\n\
             Action: the action to take, should be one of [{tool_names}]\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\
             \n\
             Thought: I now have the information needed\n\
             Final Answer: A complete, professional email reply that:\n\
             - Starts with \"Subject: Re: [topic]\"\n\
             - Greets the sender by name (\"Dear John\", not \"Dear john.doe@company.com\")\n\
             - Addresses every part of the question\n\
             - Uses information from policy documents when available\n\
             - Is friendly and professional\n\
             - Ends with an offer to help further and a signature for the recipient department\n\
             \n\
             Begin!\n\
             \n\
             Question: {input}\n\
             Thought: {scratchpad}"
        )
    }
}

/// Previous turns as `<model text>\nObservation: <obs>\nThought: `.
fn scratchpad(steps: &[AgentStep]) -> String {
    let mut pad = String::new();
    for step in steps {
        pad.push_str(&step.log);
        pad.push_str("\nObservation: ");
        pad.push_str(&step.observation);
        pad.push_str("\nThought: ");
    }
    pad
}
