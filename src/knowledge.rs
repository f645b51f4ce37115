//! Local scouting knowledge store.
//!
//! A JSON document with `players`, `teams` and `venues` maps. Entries are
//! free-form objects; the only field the code writes is a player's `id`,
//! learned from match summaries as they are fetched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::client::{Endpoint, FetchObserver};
use crate::matches::{list, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub players: BTreeMap<String, Value>,
    #[serde(default)]
    pub teams: BTreeMap<String, Value>,
    #[serde(default)]
    pub venues: BTreeMap<String, Value>,
}

/// A player seen in live data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRef {
    pub name: String,
    pub id: String,
}

/// Players listed in a match summary's team statistics.
pub fn players_in_summary(summary: &Value) -> Vec<PlayerRef> {
    let stats = summary.get("statistics").unwrap_or(&Value::Null);
    list(stats, "teams")
        .iter()
        .flat_map(|team| list(team, "players"))
        .filter_map(|p| {
            Some(PlayerRef {
                name: text(p, "name")?.to_string(),
                id: text(p, "id")?.to_string(),
            })
        })
        .collect()
}

pub struct KnowledgeBase {
    path: Option<PathBuf>,
    doc: RwLock<Document>,
    revision: AtomicU64,
    /// Revision of the last body written to `path`.
    written: Arc<Mutex<u64>>,
}

/// A serialized document, numbered in the order the changes were made.
struct Snapshot {
    revision: u64,
    body: String,
}

impl KnowledgeBase {
    /// Load from a file. A missing file is an empty store that will be
    /// created on the first harvest.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid knowledge file {}", path.display()))?
        } else {
            warn!(path = %path.display(), "knowledge file not found, starting empty");
            Document::default()
        };
        Ok(Self::with_path(Some(path), doc))
    }

    /// A store that is never written to disk.
    pub fn in_memory(doc: Document) -> Self {
        Self::with_path(None, doc)
    }

    fn with_path(path: Option<PathBuf>, doc: Document) -> Self {
        Self {
            path,
            doc: RwLock::new(doc),
            revision: AtomicU64::new(0),
            written: Arc::new(Mutex::new(0)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> Document {
        self.doc.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Scouting reports for a team, player or venue.
    ///
    /// Teams and venues match exactly first, then by substring in either
    /// direction. Players match by name or by a mention in their report.
    pub fn lookup(&self, name: &str) -> Vec<String> {
        let doc = self.doc.read().unwrap_or_else(PoisonError::into_inner);
        let needle = name.to_lowercase();
        let overlaps = |key: &str| {
            let key = key.to_lowercase();
            key.contains(&needle) || needle.contains(&key)
        };
        let mut reports = Vec::new();

        let mut named = |kind: &str, entries: &BTreeMap<String, Value>| match entries.get(name) {
            Some(report) => reports.push(format!("{} Report ({}): {}", kind, name, report)),
            None => reports.extend(
                entries
                    .iter()
                    .filter(|(key, _)| overlaps(key.as_str()))
                    .map(|(key, report)| format!("{} Report ({}): {}", kind, key, report)),
            ),
        };
        named("Team", &doc.teams);
        named("Venue", &doc.venues);

        reports.extend(
            doc.players
                .iter()
                .filter(|(key, report)| {
                    overlaps(key.as_str())
                        || text(report, "scouting_report")
                            .is_some_and(|r| r.to_lowercase().contains(&needle))
                })
                .map(|(key, report)| format!("Player Report ({}): {}", key, report)),
        );

        reports
    }

    /// Known provider id for an exact player name.
    pub fn player_id(&self, name: &str) -> Option<String> {
        let doc = self.doc.read().unwrap_or_else(PoisonError::into_inner);
        text(doc.players.get(name)?, "id").map(str::to_string)
    }

    /// First team whose name contains `name` (case-insensitive) and has an id.
    pub fn find_team(&self, name: &str) -> Option<(String, String)> {
        let needle = name.to_lowercase();
        let doc = self.doc.read().unwrap_or_else(PoisonError::into_inner);
        doc.teams.iter().find_map(|(team, entry)| {
            if team.to_lowercase().contains(&needle) {
                Some((team.clone(), text(entry, "id")?.to_string()))
            } else {
                None
            }
        })
    }

    /// Every team that has a provider id, as `(name, id)`.
    pub fn teams_with_ids(&self) -> Vec<(String, String)> {
        let doc = self.doc.read().unwrap_or_else(PoisonError::into_inner);
        doc.teams
            .iter()
            .filter_map(|(team, entry)| Some((team.clone(), text(entry, "id")?.to_string())))
            .collect()
    }

    pub fn team_names(&self) -> Vec<String> {
        let doc = self.doc.read().unwrap_or_else(PoisonError::into_inner);
        doc.teams.keys().cloned().collect()
    }

    /// The raw entry for an exact team name.
    pub fn team(&self, name: &str) -> Option<Value> {
        let doc = self.doc.read().unwrap_or_else(PoisonError::into_inner);
        doc.teams.get(name).cloned()
    }

    /// Record player ids. New players are added, known players without an
    /// id get one, existing ids are left alone. Returns whether anything
    /// changed; the file is rewritten only then.
    pub fn harvest(&self, players: &[PlayerRef]) -> Result<bool> {
        let Some(snapshot) = self.learn(players)? else {
            return Ok(false);
        };
        if let Some(path) = &self.path {
            persist(path, &self.written, snapshot)?;
        }
        Ok(true)
    }

    /// Apply `players` and, if anything changed, serialize the document.
    /// The lock is released before the caller writes the file.
    fn learn(&self, players: &[PlayerRef]) -> Result<Option<Snapshot>> {
        let mut doc = self.doc.write().unwrap_or_else(PoisonError::into_inner);
        let mut learned = 0usize;

        for player in players {
            let entry = doc
                .players
                .entry(player.name.clone())
                .or_insert_with(|| json!({}));
            match entry.as_object_mut() {
                Some(fields) if !fields.contains_key("id") => {
                    fields.insert("id".to_string(), Value::String(player.id.clone()));
                    learned += 1;
                }
                _ => {}
            }
        }

        if learned == 0 {
            return Ok(None);
        }
        info!(learned, "knowledge base learned new player ids");
        Ok(Some(Snapshot {
            revision: self.revision.fetch_add(1, Ordering::SeqCst) + 1,
            body: serde_json::to_string_pretty(&*doc)?,
        }))
    }
}

/// Write `snapshot` unless a later one is already on disk.
fn persist(path: &Path, written: &Mutex<u64>, snapshot: Snapshot) -> Result<()> {
    let mut written = written.lock().unwrap_or_else(PoisonError::into_inner);
    if *written >= snapshot.revision {
        return Ok(());
    }
    std::fs::write(path, snapshot.body)
        .with_context(|| format!("failed to write {}", path.display()))?;
    *written = snapshot.revision;
    Ok(())
}

impl FetchObserver for KnowledgeBase {
    /// Called from async fetches, so on a runtime the file write goes to
    /// the blocking pool.
    fn observe(&self, endpoint: &Endpoint, body: &Value) {
        if !matches!(endpoint, Endpoint::MatchSummary(_)) {
            return;
        }
        let players = players_in_summary(body);
        if players.is_empty() {
            return;
        }
        let snapshot = match self.learn(&players) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "failed to serialize harvested player ids");
                return;
            }
        };
        let Some(path) = self.path.clone() else {
            return;
        };
        let written = Arc::clone(&self.written);
        let write = move || {
            if let Err(e) = persist(&path, &written, snapshot) {
                warn!(error = %e, "failed to persist harvested player ids");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}
