pub mod react;

use anyhow::Result;
use async_trait::async_trait;

use crate::approval::{ApprovalRequired, Turn};
use crate::events::EventSender;

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Answer(String),
    /// A sensitive action was requested without approval; the turn pauses.
    Interrupted(ApprovalRequired),
}

/// One reasoning run per turn. The bridge only knows this trait.
/// Progress goes to `events`; the terminal outcome is the return value.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn run(&self, turn: &Turn, events: &EventSender) -> Result<Completion>;
}
