//! Ordered event queue between a reasoning run and its stream driver.
//!
//! Tool hooks and the engine push [`DomainEvent`]s through an
//! [`EventSender`]; the bridge owns the single [`EventReceiver`]. Built on
//! [`tokio::sync::mpsc::unbounded_channel`], so producers never block and
//! nothing is dropped while the receiver is alive.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::approval::ApprovalRequired;

/// Something that happened during a run, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A tool invocation is about to run.
    ToolStarted { tool: String, input: String },
    /// A tool invocation finished (successfully or with an error message).
    ToolResult { tool: String, output: String },
    /// The reasoning process explained its next move.
    Reasoning { thought: String },
    /// The run stopped because a sensitive action needs confirmation.
    ApprovalRequired(ApprovalRequired),
    /// The run finished with an answer.
    FinalAnswer { content: String },
    /// The run failed.
    Error { message: String },
}

impl DomainEvent {
    /// Terminal events end a stream; exactly one is delivered per run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ApprovalRequired(_) | Self::FinalAnswer { .. } | Self::Error { .. }
        )
    }

    /// The record pushed to the client.
    pub fn to_wire(&self) -> WireEvent {
        match self {
            Self::ToolStarted { tool, input } => WireEvent {
                details: Some(input.clone()),
                ..WireEvent::new("action", format!("Accessing tool: {}", tool))
            },
            Self::ToolResult { output, .. } => WireEvent::new("observation", output.clone()),
            Self::Reasoning { thought } => {
                WireEvent::new("thought", format!("Thinking: {}", thought))
            }
            Self::ApprovalRequired(pending) => WireEvent {
                requires_approval: Some(true),
                approval_action: Some(pending.action.clone()),
                ..WireEvent::new("observation", pending.payload().to_string())
            },
            Self::FinalAnswer { content } => WireEvent::new("answer", content.clone()),
            Self::Error { message } => WireEvent::new("error", message.clone()),
        }
    }
}

/// JSON shape of one server-sent event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(rename = "_requiresApproval", skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
    #[serde(rename = "_approvalAction", skip_serializing_if = "Option::is_none")]
    pub approval_action: Option<String>,
}

impl WireEvent {
    fn new(kind: &'static str, content: String) -> Self {
        Self {
            kind,
            content,
            details: None,
            requires_approval: None,
            approval_action: None,
        }
    }
}

/// Create a connected sender/receiver pair.
pub fn queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer half. Cheap to clone; every tool hook gets one.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventSender {
    /// Append an event. Returns false when the consumer is gone.
    pub fn emit(&self, event: DomainEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Consumer half, owned by the stream driver.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<DomainEvent>,
}

impl EventReceiver {
    /// Wait for the next event. `None` once every sender is dropped and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<DomainEvent> {
        self.rx.try_recv().ok()
    }
}
