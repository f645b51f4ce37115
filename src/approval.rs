//! Per-turn approval gate.
//!
//! Every sensitive tool asks the [`Turn`] it runs under whether the user
//! already approved it. A turn is approved when the inbound chat message
//! starts with [`APPROVAL_MARKER`]. When it is not, the tool gets back an
//! [`ApprovalRequired`] value that travels up through the engine and the
//! bridge as an ordinary return value, ending the turn with an approval
//! request instead of an answer.
//!
//! The turn is created per request and threaded through the run, so one
//! user's approval never authorizes another user's pending task.

use serde_json::{Value, json};

use crate::consts::APPROVAL_MARKER;

/// The inbound chat message a run was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    message: String,
}

impl Turn {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The verbatim user message.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_approved(&self) -> bool {
        self.message.trim().starts_with(APPROVAL_MARKER)
    }

    /// Gate a sensitive action. Must be called before the action does any work.
    pub fn verify(&self, action: &str) -> Result<(), ApprovalRequired> {
        if self.is_approved() {
            Ok(())
        } else {
            Err(ApprovalRequired::new(action))
        }
    }
}

/// A pending action that needs explicit user confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequired {
    pub action: String,
}

impl ApprovalRequired {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }

    /// Machine-readable description sent to the client.
    pub fn payload(&self) -> Value {
        json!({
            "status": "approval_required",
            "message": format!("Please approve the following action: {}", self.action),
            "action": self.action,
        })
    }
}
