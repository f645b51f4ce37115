//! Match list aggregation and helpers for reading provider JSON.
//!
//! The provider's documents are loosely shaped, so everything here reads
//! through `serde_json::Value` and treats missing fields as absent rather
//! than as errors.

use std::collections::HashSet;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::client::ApiClient;

static NULL: Value = Value::Null;

/// Recent matches that get a summary lookup for their score line.
const RECENT_WITH_SCORES: usize = 10;

/// Result words that only restate the status and are not worth showing.
const BARE_RESULTS: &[&str] = &["ended", "closed", "finished", "not_started"];

/// Non-empty string field.
pub(crate) fn text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str().filter(|s| !s.is_empty())
}

/// Array field, empty when missing.
pub(crate) fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn sport_events(schedule: &Value) -> &[Value] {
    list(schedule, "sport_events")
}

/// Competitors of a schedule event or a match summary.
pub(crate) fn competitors(doc: &Value) -> &[Value] {
    let direct = list(doc, "competitors");
    if direct.is_empty() {
        list(doc.get("sport_event").unwrap_or(&NULL), "competitors")
    } else {
        direct
    }
}

pub(crate) fn team_names(event: &Value) -> (String, String) {
    let comps = competitors(event);
    let name = |i: usize| {
        comps
            .get(i)
            .and_then(|c| text(c, "name"))
            .unwrap_or("Unknown")
            .to_string()
    };
    (name(0), name(1))
}

pub(crate) fn status_block(summary: &Value) -> &Value {
    summary.get("sport_event_status").unwrap_or(&NULL)
}

/// Status of a schedule entry, wherever the provider put it.
pub(crate) fn event_status(event: &Value) -> Option<&str> {
    text(status_block(event), "status").or_else(|| text(event, "status"))
}

/// `"type: display_score"` for each period, comma separated.
pub(crate) fn period_line(status: &Value) -> String {
    list(status, "period_scores")
        .iter()
        .map(|p| {
            format!(
                "{}: {}",
                text(p, "type").unwrap_or("period"),
                text(p, "display_score").unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Live,
    Upcoming,
    Recent,
}

/// One row of the match list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchItem {
    pub id: String,
    pub team1: String,
    pub team2: String,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub start_time: String,
    pub score: String,
    pub result: String,
    #[serde(rename = "type")]
    pub kind: MatchKind,
}

#[derive(Debug, Default, Serialize)]
pub struct MatchList {
    pub live: Vec<MatchItem>,
    pub upcoming: Vec<MatchItem>,
    pub recent: Vec<MatchItem>,
}

/// A live schedule entry, enriched with its summary when one was fetched.
pub fn live_item(event: &Value, summary: Option<&Value>) -> Option<MatchItem> {
    let id = text(event, "id")?;
    let (team1, team2) = team_names(event);
    let (status, score) = match summary {
        Some(summary) => {
            let block = status_block(summary);
            (
                text(block, "status").unwrap_or("Live").to_string(),
                period_line(block),
            )
        }
        None => ("Live".to_string(), String::new()),
    };

    Some(MatchItem {
        id: id.to_string(),
        team1,
        team2,
        status,
        start_time: String::new(),
        score,
        result: String::new(),
        kind: MatchKind::Live,
    })
}

/// Guess a status from the scheduled start when the provider left it out.
fn infer_status(start_time: &str, now: DateTime<Utc>) -> &'static str {
    match DateTime::parse_from_rfc3339(start_time) {
        Ok(start) if start.timestamp() < now.timestamp() => "ended",
        Ok(_) => "not_started",
        Err(_) => "scheduled",
    }
}

/// Classify a daily-schedule entry as upcoming or recent. Entries with fewer
/// than two competitors or any other status are skipped.
pub fn scheduled_item(event: &Value, now: DateTime<Utc>) -> Option<MatchItem> {
    let id = text(event, "id")?;
    if competitors(event).len() < 2 {
        return None;
    }
    let (team1, team2) = team_names(event);
    let start_time = text(event, "scheduled").unwrap_or_default().to_string();

    let status = match event_status(event) {
        Some(status) if status != "Unknown" => status.to_string(),
        _ => infer_status(&start_time, now).to_string(),
    };
    let kind = match status.as_str() {
        "closed" | "ended" | "postponed" => MatchKind::Recent,
        "not_started" | "scheduled" => MatchKind::Upcoming,
        _ => return None,
    };

    Some(MatchItem {
        id: id.to_string(),
        team1,
        team2,
        status,
        start_time,
        score: String::new(),
        result: String::new(),
        kind,
    })
}

/// Fill score and result text of a finished match from its summary.
pub fn apply_summary(item: &mut MatchItem, summary: &Value) {
    let status = status_block(summary);
    if let Some(s) = text(status, "status") {
        item.status = s.to_string();
    }

    let innings: Vec<&str> = list(status, "period_scores")
        .iter()
        .filter_map(|p| text(p, "display_score"))
        .collect();
    item.score = if innings.is_empty() {
        text(status, "display_score").unwrap_or_default().to_string()
    } else {
        innings.join(" vs ")
    };

    let result = text(status, "match_result").or_else(|| text(status, "match_status"));
    item.result = match result {
        Some(r) if !BARE_RESULTS.contains(&r.to_lowercase().as_str()) => r.to_string(),
        _ if !item.score.is_empty() => "Match Ended".to_string(),
        _ => String::new(),
    };
}

/// Live, upcoming and recent matches, built from repeated client calls.
///
/// Today's and yesterday's schedules are both read because matches often
/// run past midnight.
pub async fn build_match_list(client: &ApiClient, now: DateTime<Local>) -> MatchList {
    let mut list = MatchList::default();

    if let Some(live) = client.fetch_live_schedule().await {
        for event in sport_events(&live) {
            let summary = match text(event, "id") {
                Some(id) => client.fetch_match_summary(id).await,
                None => None,
            };
            if let Some(item) = live_item(event, summary.as_deref()) {
                list.live.push(item);
            }
        }
    }

    let today = now.date_naive();
    let mut schedules = vec![client.fetch_schedule_for_date(today).await];
    if let Some(yesterday) = today.pred_opt() {
        schedules.push(client.fetch_schedule_for_date(yesterday).await);
    }

    let live_ids: HashSet<String> = list.live.iter().map(|m| m.id.clone()).collect();
    let mut seen = HashSet::new();
    let now_utc = now.with_timezone(&Utc);

    for schedule in schedules.iter().flatten() {
        for event in sport_events(schedule) {
            let Some(item) = scheduled_item(event, now_utc) else {
                continue;
            };
            if live_ids.contains(&item.id) || !seen.insert(item.id.clone()) {
                continue;
            }
            match item.kind {
                MatchKind::Recent => list.recent.push(item),
                MatchKind::Upcoming => list.upcoming.push(item),
                MatchKind::Live => {}
            }
        }
    }

    list.recent.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    list.upcoming.sort_by(|a, b| a.start_time.cmp(&b.start_time));

    for item in list.recent.iter_mut().take(RECENT_WITH_SCORES) {
        if let Some(summary) = client.fetch_match_summary(&item.id).await {
            apply_summary(item, &summary);
        }
    }

    list
}
