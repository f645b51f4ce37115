pub mod approval;
pub mod live;
pub mod matchup;
pub mod players;
pub mod probability;
pub mod scouting;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::approval::{ApprovalRequired, Turn};
use crate::client::ApiClient;
use crate::knowledge::KnowledgeBase;
use crate::thinker::ToolDescription;

/// Outcome of a single tool execution. Errors are information, not failures.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(String),
    Error(String),
    /// The tool refused to run until the user approves it.
    Interrupted(ApprovalRequired),
}

/// Result of executing a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool: String,
    /// Arguments the call was made with, replayed to the thinker.
    pub args: HashMap<String, String>,
    pub outcome: Outcome,
}

/// What a tool hands back when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Output(String),
    Interrupted(ApprovalRequired),
}

impl From<ApprovalRequired> for Reply {
    fn from(pending: ApprovalRequired) -> Self {
        Self::Interrupted(pending)
    }
}

/// Something the reasoning process can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn execute(&self, args: &HashMap<String, String>, turn: &Turn) -> Result<Reply>;
}

/// Fetch a required argument.
pub(crate) fn required<'a>(args: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    args.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing required arg: {}", key))
}

/// Holds all registered tools. RwLock allows runtime registration + parallel reads.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// A registry with every cricket tool wired to the shared client and store.
    pub async fn cricket(client: Arc<ApiClient>, knowledge: Arc<KnowledgeBase>) -> Self {
        let registry = Self::new();
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(approval::RequestApprovalTool),
            Arc::new(live::LiveMatchTool::new(Arc::clone(&client))),
            Arc::new(live::DailyResultsTool::new(Arc::clone(&client))),
            Arc::new(players::PlayerProfileTool::new(Arc::clone(&client))),
            Arc::new(players::CareerStatsTool::new(
                Arc::clone(&client),
                Arc::clone(&knowledge),
            )),
            Arc::new(matchup::MatchupTool::new(
                Arc::clone(&client),
                Arc::clone(&knowledge),
            )),
            Arc::new(scouting::ScoutingNotesTool::new(Arc::clone(&knowledge))),
            Arc::new(probability::WinProbabilityTool::new(knowledge)),
        ];
        for tool in tools {
            registry.register(tool).await;
        }
        registry
    }

    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.write().await.insert(name, tool);
    }

    pub async fn unregister(&self, name: &str) {
        self.tools.write().await.remove(name);
    }

    pub async fn execute(
        &self,
        tool_name: &str,
        args: &HashMap<String, String>,
        turn: &Turn,
    ) -> ToolResult {
        let tool = self.tools.read().await.get(tool_name).cloned();
        let outcome = match tool {
            Some(tool) => match tool.execute(args, turn).await {
                Ok(Reply::Output(output)) => Outcome::Success(output),
                Ok(Reply::Interrupted(pending)) => Outcome::Interrupted(pending),
                Err(e) => Outcome::Error(e.to_string()),
            },
            None => Outcome::Error(format!("unknown tool: {}", tool_name)),
        };
        ToolResult {
            tool: tool_name.to_string(),
            args: args.clone(),
            outcome,
        }
    }

    /// Descriptions sorted by name.
    pub async fn descriptions(&self) -> Vec<ToolDescription> {
        let mut descriptions: Vec<ToolDescription> = self
            .tools
            .read()
            .await
            .values()
            .map(|t| ToolDescription {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect();
        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }
}
