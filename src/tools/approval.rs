use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use super::{Reply, Tool, required};
use crate::approval::{ApprovalRequired, Turn};

/// Pauses the turn and asks the user to confirm an action.
pub struct RequestApprovalTool;

#[async_trait]
impl Tool for RequestApprovalTool {
    fn name(&self) -> &str {
        "request_user_approval"
    }

    fn description(&self) -> &str {
        "Stop and ask the user for permission before a data or analysis tool. \
         Args: {\"action_description\": \"what you want to do, e.g. Fetch live match context\"}. \
         The turn ends here; the user replies with the approval phrase to continue."
    }

    async fn execute(&self, args: &HashMap<String, String>, _turn: &Turn) -> Result<Reply> {
        let action = required(args, "action_description")?;
        Ok(ApprovalRequired::new(action).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::APPROVAL_MARKER;

    #[tokio::test]
    async fn always_interrupts_even_when_approved() {
        let args = HashMap::from([(
            "action_description".to_string(),
            "Fetch live match context".to_string(),
        )]);
        let approved = format!("{} live score", APPROVAL_MARKER);
        for message in ["show me the score", approved.as_str()] {
            let reply = RequestApprovalTool
                .execute(&args, &Turn::new(message))
                .await
                .unwrap();
            assert_eq!(
                reply,
                Reply::Interrupted(ApprovalRequired::new("Fetch live match context"))
            );
        }
    }

    #[tokio::test]
    async fn needs_a_description() {
        let err = RequestApprovalTool
            .execute(&HashMap::new(), &Turn::new("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("action_description"));
    }
}
