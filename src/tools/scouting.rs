use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Reply, Tool, required};
use crate::approval::Turn;
use crate::knowledge::KnowledgeBase;

/// Local scouting reports on a player, team or venue.
pub struct ScoutingNotesTool {
    knowledge: Arc<KnowledgeBase>,
}

impl ScoutingNotesTool {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Tool for ScoutingNotesTool {
    fn name(&self) -> &str {
        "check_scouting_notes"
    }

    fn description(&self) -> &str {
        "Scouting reports from the local knowledge base. \
         Args: {\"name\": \"exact player name (V. Kohli), team (India) or venue\"}. \
         Requires user approval first."
    }

    async fn execute(&self, args: &HashMap<String, String>, turn: &Turn) -> Result<Reply> {
        if let Err(pending) = turn.verify(self.name()) {
            return Ok(pending.into());
        }
        let name = required(args, "name")?;

        let reports = self.knowledge.lookup(name);
        Ok(Reply::Output(if reports.is_empty() {
            format!("No scouting report found for '{}'.", name)
        } else {
            reports.join("\n")
        }))
    }
}
