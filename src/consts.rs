//! Project-wide constants.

use std::time::Duration;

/// Default Anthropic model when none is specified.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Literal prefix a user message must start with to authorize sensitive tools.
pub const APPROVAL_MARKER: &str = "I approve. Proceed with:";

/// Sportradar access level (`t` = trial, `p` = production).
pub const DEFAULT_ACCESS_LEVEL: &str = "t";
pub const DEFAULT_LANGUAGE: &str = "en";

/// The provider allows ~1 QPS; stay a little under it.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1200);

/// Wait before the single retry after an HTTP 429.
pub const QUOTA_BACKOFF: Duration = Duration::from_secs(2);

/// Per-request upstream timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// Cache capacities, per endpoint class.
pub const DAILY_SCHEDULE_CACHE: u64 = 32;
pub const MATCH_SUMMARY_CACHE: u64 = 10;
pub const PLAYER_PROFILE_CACHE: u64 = 10;
pub const TEAM_PROFILE_CACHE: u64 = 5;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_KNOWLEDGE_PATH: &str = "knowledge.json";

/// Build the provider base URL for an access level and language.
pub fn base_url(access_level: &str, language: &str) -> String {
    format!(
        "https://api.sportradar.com/cricket-{}2/{}",
        access_level, language
    )
}
