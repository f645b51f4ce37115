use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use super::{Reply, Tool, required};
use crate::approval::Turn;
use crate::knowledge::KnowledgeBase;

/// Outcome of the chase heuristic.
#[derive(Debug, Clone, PartialEq)]
pub enum Chase {
    Over { chasing_team_won: bool },
    InProgress { win_percent: f64, required_rate: f64 },
}

/// T20 chase heuristic: start at even odds, move five points per run of
/// required rate away from eight an over, then adjust for wickets in hand.
/// Clamped to 1..=99 while balls remain.
pub fn win_probability(runs_needed: i64, balls_remaining: i64, wickets_in_hand: i64) -> Chase {
    if balls_remaining <= 0 {
        return Chase::Over {
            chasing_team_won: runs_needed <= 0,
        };
    }

    let required_rate = runs_needed as f64 * 6.0 / balls_remaining as f64;
    let mut win_percent = 50.0 + (8.0 - required_rate) * 5.0;
    if wickets_in_hand < 4 {
        win_percent -= 20.0;
    } else if wickets_in_hand > 7 {
        win_percent += 10.0;
    }

    Chase::InProgress {
        win_percent: win_percent.clamp(1.0, 99.0),
        required_rate,
    }
}

pub fn situation(required_rate: f64) -> &'static str {
    if required_rate > 12.0 {
        "Required Run Rate is extremely high. Only a miracle or bad bowling can save this."
    } else if required_rate > 10.0 {
        "Tough ask. Needs boundaries every over."
    } else if required_rate < 6.0 {
        "Cruising. Just need to rotate strike."
    } else {
        "Balanced game. Wickets will differentiate the winner."
    }
}

fn integer(args: &HashMap<String, String>, key: &str) -> Result<i64> {
    let raw = required(args, key)?;
    raw.parse()
        .with_context(|| format!("{} must be a whole number, got '{}'", key, raw))
}

fn string_list(entry: &Value, key: &str) -> Vec<String> {
    entry
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Heuristic chase probability plus what the knowledge base says about
/// both teams.
pub struct WinProbabilityTool {
    knowledge: Arc<KnowledgeBase>,
}

impl WinProbabilityTool {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    fn team_context(&self, chasing: &str, defending: &str) -> String {
        let chasing_info = self.knowledge.team(chasing);
        let defending_info = self.knowledge.team(defending);
        if chasing_info.is_none() && defending_info.is_none() {
            return "\n\n*(No tactical scouting reports found in the local knowledge base for \
                    these teams.)*"
                .to_string();
        }

        let mut context = String::from("\n\n**Qualitative Context:**");
        for (team, info) in [(chasing, chasing_info), (defending, defending_info)] {
            let Some(info) = info else { continue };
            for (label, key) in [("Strengths", "strengths"), ("Weaknesses", "weaknesses")] {
                let items = string_list(&info, key);
                if !items.is_empty() {
                    let _ = write!(context, "\n- {} {}: {}", team, label, items.join(", "));
                }
            }
        }
        context
    }
}

#[async_trait]
impl Tool for WinProbabilityTool {
    fn name(&self) -> &str {
        "calculate_win_probability"
    }

    fn description(&self) -> &str {
        "Win probability for the chasing side with tactical context. \
         Args: {\"runs_needed\": \"45\", \"balls_remaining\": \"30\", \"wickets_in_hand\": \"6\", \
         \"chasing_team\": \"India\", \"defending_team\": \"Zimbabwe\"}. \
         Requires user approval first."
    }

    async fn execute(&self, args: &HashMap<String, String>, turn: &Turn) -> Result<Reply> {
        if let Err(pending) = turn.verify(self.name()) {
            return Ok(pending.into());
        }
        let runs_needed = integer(args, "runs_needed")?;
        let balls_remaining = integer(args, "balls_remaining")?;
        let wickets_in_hand = integer(args, "wickets_in_hand")?;
        let chasing = required(args, "chasing_team")?;
        let defending = required(args, "defending_team")?;

        let output = match win_probability(runs_needed, balls_remaining, wickets_in_hand) {
            Chase::Over {
                chasing_team_won: true,
            } => "Match Over: Chasing team wins!".to_string(),
            Chase::Over {
                chasing_team_won: false,
            } => "Match Over: Defending team wins!".to_string(),
            Chase::InProgress {
                win_percent,
                required_rate,
            } => format!(
                "**Mathematical Win Probability**: {:.1}%\n**Required Run Rate**: {:.2}\n\
                 **Situation**: {}{}",
                win_percent,
                required_rate,
                situation(required_rate),
                self.team_context(chasing, defending)
            ),
        };
        Ok(Reply::Output(output))
    }
}
