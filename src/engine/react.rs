use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Completion, Engine};
use crate::approval::Turn;
use crate::events::{DomainEvent, EventSender};
use crate::thinker::{Context, Iteration, Step, Thinker, TokenUsage, ToolCall};
use crate::tools::{Outcome, ToolRegistry, ToolResult};

#[derive(Debug, Clone)]
pub struct ReactConfig {
    pub max_iterations: usize,
    pub tool_timeout: Duration,
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// The ReAct loop. Wires together a Thinker and a ToolRegistry.
///
/// Stateless between runs: history lives on the stack of `run`, so one
/// engine serves concurrent turns.
pub struct ReactEngine {
    thinker: Arc<dyn Thinker>,
    tools: Arc<ToolRegistry>,
    config: ReactConfig,
}

impl ReactEngine {
    pub fn new(thinker: Arc<dyn Thinker>, tools: Arc<ToolRegistry>, config: ReactConfig) -> Self {
        Self {
            thinker,
            tools,
            config,
        }
    }

    async fn call(&self, call: ToolCall, turn: &Turn, events: &EventSender) -> ToolResult {
        let input = serde_json::to_string(&call.args).unwrap_or_default();
        events.emit(DomainEvent::ToolStarted {
            tool: call.tool.clone(),
            input,
        });

        let result = match tokio::time::timeout(
            self.config.tool_timeout,
            self.tools.execute(&call.tool, &call.args, turn),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => ToolResult {
                tool: call.tool,
                args: call.args,
                outcome: Outcome::Error("timed out".to_string()),
            },
        };

        let output = match &result.outcome {
            Outcome::Success(out) => Some(out.clone()),
            Outcome::Error(err) => Some(format!("error: {}", err)),
            Outcome::Interrupted(_) => None,
        };
        if let Some(output) = output {
            events.emit(DomainEvent::ToolResult {
                tool: result.tool.clone(),
                output,
            });
        }
        result
    }
}

#[async_trait]
impl Engine for ReactEngine {
    async fn run(&self, turn: &Turn, events: &EventSender) -> Result<Completion> {
        let mut history: Vec<Iteration> = Vec::new();
        let mut usage = TokenUsage::default();

        for iteration in 0..self.config.max_iterations {
            let context = Context {
                message: turn.message(),
                history: &history,
                available_tools: self.tools.descriptions().await,
            };
            let step = self.thinker.next_step(&context).await?;
            if let Some(u) = step.usage {
                usage.add(u);
            }

            match step.step {
                Step::Act { thought, calls } => {
                    info!(
                        iteration = iteration + 1,
                        calls = calls.len(),
                        "executing tool calls"
                    );
                    if !thought.is_empty() {
                        events.emit(DomainEvent::Reasoning {
                            thought: thought.clone(),
                        });
                    }

                    let results = futures::future::join_all(
                        calls.into_iter().map(|call| self.call(call, turn, events)),
                    )
                    .await;

                    for result in &results {
                        match &result.outcome {
                            Outcome::Success(_) => debug!(tool = %result.tool, "tool succeeded"),
                            Outcome::Error(err) => {
                                warn!(tool = %result.tool, error = %err, "tool failed")
                            }
                            Outcome::Interrupted(pending) => {
                                info!(tool = %result.tool, action = %pending.action, "approval required")
                            }
                        }
                    }

                    if let Some(pending) = results.iter().find_map(|r| match &r.outcome {
                        Outcome::Interrupted(pending) => Some(pending.clone()),
                        _ => None,
                    }) {
                        return Ok(Completion::Interrupted(pending));
                    }

                    history.push(Iteration { thought, results });
                }

                Step::Finish { thought, answer } => {
                    if !thought.is_empty() {
                        events.emit(DomainEvent::Reasoning { thought });
                    }
                    info!(
                        iterations = iteration + 1,
                        tokens = usage.total(),
                        "run finished"
                    );
                    return Ok(Completion::Answer(answer));
                }
            }
        }

        bail!("max iterations ({}) reached", self.config.max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let config = ReactConfig::default();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
    }
}
