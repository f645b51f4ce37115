//! Runs one turn in the background and exposes its progress as a stream.
//!
//! The engine is spawned onto the runtime with a fresh event queue. The
//! stream yields queued events in order while the task runs, drains
//! whatever is left once it finishes, and then yields exactly one terminal
//! event built from how the task ended.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

use crate::approval::Turn;
use crate::engine::{Completion, Engine};
use crate::events::{self, DomainEvent, EventReceiver};

const EMPTY_ANSWER: &str = "No output generated.";

type RunResult = anyhow::Result<Completion>;

enum Phase {
    Running {
        rx: EventReceiver,
        task: JoinHandle<RunResult>,
    },
    Draining {
        rx: EventReceiver,
        terminal: DomainEvent,
    },
    Finished,
}

/// Map how the task ended to the one event that closes the stream.
fn terminal_event(joined: Result<RunResult, JoinError>) -> DomainEvent {
    match joined {
        Ok(Ok(Completion::Answer(answer))) => {
            info!("turn completed");
            let content = if answer.trim().is_empty() {
                EMPTY_ANSWER.to_string()
            } else {
                answer
            };
            DomainEvent::FinalAnswer { content }
        }
        Ok(Ok(Completion::Interrupted(pending))) => {
            info!(action = %pending.action, "turn interrupted for approval");
            DomainEvent::ApprovalRequired(pending)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "turn failed");
            DomainEvent::Error {
                message: format!("{:#}", e),
            }
        }
        Err(e) => {
            warn!(error = %e, "turn task aborted");
            DomainEvent::Error {
                message: format!("reasoning task failed: {}", e),
            }
        }
    }
}

pub struct ExecutionBridge {
    engine: Arc<dyn Engine>,
}

impl ExecutionBridge {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Start a run for `turn`. Dropping the stream does not cancel the run.
    pub fn start(&self, turn: Turn) -> BoxStream<'static, DomainEvent> {
        let (tx, rx) = events::queue();
        let engine = Arc::clone(&self.engine);
        let task = tokio::spawn(async move { engine.run(&turn, &tx).await });

        stream::unfold(Phase::Running { rx, task }, |phase| async move {
            match phase {
                Phase::Running { mut rx, mut task } => {
                    tokio::select! {
                        biased;
                        Some(event) = rx.recv() => Some((event, Phase::Running { rx, task })),
                        joined = &mut task => {
                            let terminal = terminal_event(joined);
                            match rx.try_recv() {
                                Some(event) => Some((event, Phase::Draining { rx, terminal })),
                                None => Some((terminal, Phase::Finished)),
                            }
                        }
                    }
                }
                Phase::Draining { mut rx, terminal } => match rx.try_recv() {
                    Some(event) => Some((event, Phase::Draining { rx, terminal })),
                    None => Some((terminal, Phase::Finished)),
                },
                Phase::Finished => None,
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalRequired;

    #[test]
    fn empty_answer_is_replaced() {
        let event = terminal_event(Ok(Ok(Completion::Answer("  ".into()))));
        assert_eq!(
            event,
            DomainEvent::FinalAnswer {
                content: EMPTY_ANSWER.into()
            }
        );
    }

    #[test]
    fn error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection reset").context("thinker call failed");
        match terminal_event(Ok(Err(err))) {
            DomainEvent::Error { message } => {
                assert_eq!(message, "thinker call failed: connection reset")
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn interrupt_maps_to_approval_event() {
        let pending = ApprovalRequired::new("fetch_daily_results");
        assert_eq!(
            terminal_event(Ok(Ok(Completion::Interrupted(pending.clone())))),
            DomainEvent::ApprovalRequired(pending)
        );
    }
}
