use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{Reply, Tool, required};
use crate::approval::Turn;
use crate::client::ApiClient;
use crate::knowledge::KnowledgeBase;
use crate::matches::{list, text};

const PLAYER_URN_PREFIX: &str = "sr:player:";

/// Raw provider profile for a player id.
pub struct PlayerProfileTool {
    client: Arc<ApiClient>,
}

impl PlayerProfileTool {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for PlayerProfileTool {
    fn name(&self) -> &str {
        "fetch_player_profile"
    }

    fn description(&self) -> &str {
        "Full provider profile for one player. \
         Args: {\"player_id\": \"sr:player:123456\"} (ids come from fetch_live_match_context). \
         Requires user approval first."
    }

    async fn execute(&self, args: &HashMap<String, String>, turn: &Turn) -> Result<Reply> {
        if let Err(pending) = turn.verify(self.name()) {
            return Ok(pending.into());
        }
        let player_id = required(args, "player_id")?;

        Ok(Reply::Output(
            match self.client.fetch_player_profile(player_id).await {
                Some(profile) => profile.to_string(),
                None => "No profile found.".to_string(),
            },
        ))
    }
}

/// Loose name match: equal, or either contains the other.
fn names_match(query: &str, candidate: &str) -> bool {
    let candidate = candidate.to_lowercase();
    !candidate.is_empty() && (candidate.contains(query) || query.contains(candidate.as_str()))
}

fn figure(block: &Value, key: &str) -> String {
    match block.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

fn count(block: &Value, key: &str) -> String {
    match block.get(key) {
        Some(Value::Null) | None => "0".to_string(),
        Some(_) => figure(block, key),
    }
}

/// One-line-per-discipline career summary from a player profile.
pub(crate) fn career_summary(profile: &Value) -> String {
    let player = profile.get("player").unwrap_or(&Value::Null);
    let mut lines = vec![format!(
        "Player: {} ({})",
        text(player, "name").unwrap_or("Unknown"),
        text(player, "type").unwrap_or("Unknown")
    )];

    let stats = match profile.get("statistics").and_then(Value::as_object) {
        Some(stats) if !stats.is_empty() => stats,
        _ => {
            let keys: Vec<&str> = profile
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            lines.push("Detailed career stats not found in profile response.".to_string());
            lines.push(format!("Raw Data Keys: {}", keys.join(", ")));
            return lines.join("\n");
        }
    };

    let Some(total) = stats.get("total") else {
        let keys: Vec<&str> = stats.keys().map(String::as_str).collect();
        lines.push(format!("No 'total' stats found. Raw stats keys: {}", keys.join(", ")));
        return lines.join("\n");
    };

    if let Some(bat) = total.get("batting") {
        lines.push(format!(
            "Career Batting: {} Matches, {} Runs, Avg: {}, SR: {}",
            count(bat, "matches"),
            count(bat, "runs"),
            figure(bat, "average"),
            figure(bat, "strike_rate")
        ));
    }
    if let Some(bowl) = total.get("bowling") {
        lines.push(format!(
            "Career Bowling: {} Matches, {} Wickets, Econ: {}, Avg: {}",
            count(bowl, "matches"),
            count(bowl, "wickets"),
            figure(bowl, "economy"),
            figure(bowl, "average")
        ));
    }
    lines.join("\n")
}

/// Career batting and bowling totals, by id or by name.
pub struct CareerStatsTool {
    client: Arc<ApiClient>,
    knowledge: Arc<KnowledgeBase>,
}

impl CareerStatsTool {
    pub fn new(client: Arc<ApiClient>, knowledge: Arc<KnowledgeBase>) -> Self {
        Self { client, knowledge }
    }

    /// Known id first, then the rosters of every team with an id.
    async fn resolve(&self, name: &str) -> Option<String> {
        if let Some(id) = self.knowledge.player_id(name) {
            debug!(name, %id, "player id from knowledge base");
            return Some(id);
        }

        let query = name.to_lowercase();
        for (team, team_id) in self.knowledge.teams_with_ids() {
            let Some(profile) = self.client.fetch_team_profile(&team_id).await else {
                continue;
            };
            let found = list(&profile, "players")
                .iter()
                .find(|p| text(p, "name").is_some_and(|n| names_match(&query, n)))
                .and_then(|p| text(p, "id"));
            if let Some(id) = found {
                debug!(name, %team, id, "player id from team roster");
                return Some(id.to_string());
            }
        }
        None
    }
}

#[async_trait]
impl Tool for CareerStatsTool {
    fn name(&self) -> &str {
        "fetch_player_career_stats"
    }

    fn description(&self) -> &str {
        "Career batting and bowling summary for a player. \
         Args: {\"player_id\": \"sr:player:123456 or a name like Virat Kohli\"}. \
         Requires user approval first."
    }

    async fn execute(&self, args: &HashMap<String, String>, turn: &Turn) -> Result<Reply> {
        if let Err(pending) = turn.verify(self.name()) {
            return Ok(pending.into());
        }
        let given = required(args, "player_id")?;

        let player_id = if given.starts_with(PLAYER_URN_PREFIX) {
            given.to_string()
        } else {
            match self.resolve(given).await {
                Some(id) => id,
                None => {
                    return Ok(Reply::Output(format!(
                        "Could not find a Player ID for '{}'. Checked the rosters of known \
                         teams ({}) without a match. Provide the exact player id (URN) or a \
                         more specific name.",
                        given,
                        self.knowledge.team_names().join(", ")
                    )));
                }
            }
        };

        Ok(Reply::Output(
            match self.client.fetch_player_profile(&player_id).await {
                Some(profile) => career_summary(&profile),
                None => "No profile found.".to_string(),
            },
        ))
    }
}
