pub mod anthropic;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::tools::ToolResult;

/// A single tool invocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub args: HashMap<String, String>,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: HashMap::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// What the thinker produces each iteration.
#[derive(Debug, Clone)]
pub enum Step {
    /// Execute tool calls. One item = single call. Multiple = parallel.
    Act {
        thought: String,
        calls: Vec<ToolCall>,
    },
    /// The turn is answered.
    Finish { thought: String, answer: String },
}

/// Token usage from a single LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// The result of a single thinker step: the step itself + optional token usage.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step: Step,
    pub usage: Option<TokenUsage>,
}

/// One finished round of tool calls earlier in the same run.
#[derive(Debug, Clone)]
pub struct Iteration {
    pub thought: String,
    pub results: Vec<ToolResult>,
}

/// Everything the thinker sees when choosing its next step.
pub struct Context<'a> {
    pub message: &'a str,
    pub history: &'a [Iteration],
    pub available_tools: Vec<ToolDescription>,
}

/// Describes a tool so the thinker knows what's available.
#[derive(Debug, Clone)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
}

/// The reasoning process. An LLM in production, a script in tests.
#[async_trait]
pub trait Thinker: Send + Sync {
    async fn next_step(&self, context: &Context<'_>) -> Result<StepResult>;
}
