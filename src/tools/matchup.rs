use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Reply, Tool};
use crate::approval::Turn;
use crate::client::ApiClient;
use crate::knowledge::KnowledgeBase;
use crate::matches::{competitors, list, text};

#[derive(Debug, Serialize)]
struct Matchup {
    teams: Vec<TeamSheet>,
    message: String,
}

#[derive(Debug, Serialize)]
struct TeamSheet {
    name: Option<String>,
    id: String,
    roster: Vec<RosterEntry>,
}

#[derive(Debug, Serialize)]
struct RosterEntry {
    name: Option<String>,
    id: Option<String>,
    role: String,
    batting: Value,
    bowling: Value,
}

fn team_sheet(team_id: &str, profile: &Value) -> TeamSheet {
    let roster = list(profile, "players")
        .iter()
        .map(|p| {
            let stats = p.get("statistics").unwrap_or(&Value::Null);
            RosterEntry {
                name: text(p, "name").map(str::to_string),
                id: text(p, "id").map(str::to_string),
                role: text(p, "type").unwrap_or("Player").to_string(),
                batting: stats.get("batting").cloned().unwrap_or_else(|| Value::Object(Default::default())),
                bowling: stats.get("bowling").cloned().unwrap_or_else(|| Value::Object(Default::default())),
            }
        })
        .collect();

    TeamSheet {
        name: profile
            .get("team")
            .and_then(|t| text(t, "name"))
            .map(str::to_string),
        id: team_id.to_string(),
        roster,
    }
}

fn no_roster_warning(teams: &[TeamSheet]) -> String {
    let names: Vec<&str> = teams
        .iter()
        .map(|t| t.name.as_deref().unwrap_or(&t.id))
        .collect();
    format!(
        "WARNING: Live roster data is unavailable from the provider. Use the \
         check_scouting_notes tool for these teams ({}) and base the analysis on the \
         local knowledge base.",
        names.join(", ")
    )
}

/// Rosters of both sides of a fixture.
pub struct MatchupTool {
    client: Arc<ApiClient>,
    knowledge: Arc<KnowledgeBase>,
}

impl MatchupTool {
    pub fn new(client: Arc<ApiClient>, knowledge: Arc<KnowledgeBase>) -> Self {
        Self { client, knowledge }
    }

    async fn teams_of_match(&self, match_id: &str) -> Vec<String> {
        let Some(summary) = self.client.fetch_match_summary(match_id).await else {
            return Vec::new();
        };
        competitors(&summary)
            .iter()
            .filter_map(|c| text(c, "id").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Tool for MatchupTool {
    fn name(&self) -> &str {
        "analyze_match_matchup"
    }

    fn description(&self) -> &str {
        "Team profiles and full rosters for both sides of a match. \
         Args: {\"match_id\": \"sr:match:123456\"} (preferred) or \
         {\"team_names\": \"India, Australia\"}. Requires user approval first."
    }

    async fn execute(&self, args: &HashMap<String, String>, turn: &Turn) -> Result<Reply> {
        if let Err(pending) = turn.verify(self.name()) {
            return Ok(pending.into());
        }

        let match_id = args.get("match_id").map(|s| s.trim()).filter(|s| !s.is_empty());
        let mut team_ids = match match_id {
            Some(id) => self.teams_of_match(id).await,
            None => Vec::new(),
        };

        if team_ids.is_empty() {
            let names: Vec<&str> = args
                .get("team_names")
                .map(|s| s.split(',').map(str::trim).filter(|n| !n.is_empty()).collect())
                .unwrap_or_default();
            if names.len() >= 2 {
                for name in names {
                    match self.knowledge.find_team(name) {
                        Some((_, id)) => team_ids.push(id),
                        None => {
                            return Ok(Reply::Output(format!(
                                "Could not find a team id for '{}' in the knowledge base. \
                                 Provide the match id from fetch_live_match_context instead.",
                                name
                            )));
                        }
                    }
                }
            }
        }

        if team_ids.len() < 2 {
            anyhow::bail!("could not identify both teams; provide a valid match_id");
        }

        let mut teams = Vec::with_capacity(team_ids.len());
        for id in &team_ids {
            if let Some(profile) = self.client.fetch_team_profile(id).await {
                teams.push(team_sheet(id, &profile));
            }
        }

        let message = if teams.iter().any(|t| !t.roster.is_empty()) {
            String::new()
        } else {
            no_roster_warning(&teams)
        };

        Ok(Reply::Output(serde_json::to_string_pretty(&Matchup {
            teams,
            message,
        })?))
    }
}
