//! Rate-limited, cached access to the Sportradar cricket API.
//!
//! One [`ApiClient`] is shared by every request in the process. Each fetch
//! goes cache → [`RateLimiter`] → HTTP GET, retries once after a 429, and
//! reports any failure as `None` so tools can degrade to partial data.

pub mod cache;
pub mod error;
pub mod limiter;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::consts::{
    DEFAULT_ACCESS_LEVEL, DEFAULT_LANGUAGE, MIN_REQUEST_INTERVAL, QUOTA_BACKOFF, REQUEST_TIMEOUT,
    base_url,
};
use cache::{CacheCapacities, ResponseCache};
use error::FetchError;
use limiter::RateLimiter;

/// Identity of one upstream request. Equal endpoints are interchangeable,
/// which makes this the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    DailySchedule(NaiveDate),
    LiveSchedule,
    MatchSummary(String),
    PlayerProfile(String),
    TeamProfile(String),
}

impl Endpoint {
    /// Path relative to the provider base URL.
    pub fn path(&self) -> String {
        match self {
            Self::DailySchedule(date) => {
                format!("/schedules/{}/schedule.json", date.format("%Y-%m-%d"))
            }
            Self::LiveSchedule => "/schedules/live/schedule.json".to_string(),
            Self::MatchSummary(id) => format!("/matches/{}/summary.json", id),
            Self::PlayerProfile(id) => format!("/players/{}/profile.json", id),
            Self::TeamProfile(id) => format!("/teams/{}/profile.json", id),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Receives every freshly fetched body (never cache hits).
pub trait FetchObserver: Send + Sync {
    fn observe(&self, endpoint: &Endpoint, body: &Value);
}

/// Connection and pacing settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub min_interval: Duration,
    pub quota_backoff: Duration,
    pub timeout: Duration,
    pub capacities: CacheCapacities,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url(DEFAULT_ACCESS_LEVEL, DEFAULT_LANGUAGE),
            min_interval: MIN_REQUEST_INTERVAL,
            quota_backoff: QUOTA_BACKOFF,
            timeout: REQUEST_TIMEOUT,
            capacities: CacheCapacities::default(),
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    quota_backoff: Duration,
    limiter: RateLimiter,
    cache: ResponseCache,
    observers: Vec<Arc<dyn FetchObserver>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("invalid upstream base URL: {}", config.base_url))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("statscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base,
            api_key: config.api_key,
            quota_backoff: config.quota_backoff,
            limiter: RateLimiter::new(config.min_interval),
            cache: ResponseCache::new(config.capacities),
            observers: Vec::new(),
        })
    }

    /// Register a hook that sees every fresh upstream body.
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub async fn fetch_schedule_for_date(&self, date: NaiveDate) -> Option<Arc<Value>> {
        self.fetch(Endpoint::DailySchedule(date)).await
    }

    pub async fn fetch_live_schedule(&self) -> Option<Arc<Value>> {
        self.fetch(Endpoint::LiveSchedule).await
    }

    pub async fn fetch_match_summary(&self, match_id: &str) -> Option<Arc<Value>> {
        self.fetch(Endpoint::MatchSummary(match_id.to_string()))
            .await
    }

    pub async fn fetch_player_profile(&self, player_id: &str) -> Option<Arc<Value>> {
        self.fetch(Endpoint::PlayerProfile(player_id.to_string()))
            .await
    }

    pub async fn fetch_team_profile(&self, team_id: &str) -> Option<Arc<Value>> {
        self.fetch(Endpoint::TeamProfile(team_id.to_string()))
            .await
    }

    /// Cached if possible, otherwise one paced upstream call (plus at most
    /// one retry). `None` means the data is temporarily unavailable.
    pub async fn fetch(&self, endpoint: Endpoint) -> Option<Arc<Value>> {
        if let Some(hit) = self.cache.get(&endpoint) {
            debug!(%endpoint, "cache hit");
            return Some(hit);
        }

        match self.dispatch(&endpoint).await {
            Ok(body) => {
                let body = Arc::new(body);
                for observer in &self.observers {
                    observer.observe(&endpoint, &body);
                }
                self.cache.insert(endpoint, Arc::clone(&body));
                Some(body)
            }
            Err(e) if e.is_definitely_absent() => {
                debug!(error = %e, "upstream has no such resource");
                None
            }
            Err(e) => {
                warn!(error = %e, "upstream fetch failed");
                None
            }
        }
    }

    async fn dispatch(&self, endpoint: &Endpoint) -> Result<Value, FetchError> {
        let path = endpoint.path();

        let mut response = self.send(&path).await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                %path,
                backoff_ms = self.quota_backoff.as_millis() as u64,
                "quota exceeded, retrying once"
            );
            tokio::time::sleep(self.quota_backoff).await;
            response = self.send(&path).await?;
        }

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::QuotaExceeded { path });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { path });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                path,
            });
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(source) => return Err(FetchError::Transport { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Malformed { path, source })
    }

    async fn send(&self, path: &str) -> Result<reqwest::Response, FetchError> {
        let url = self.url_for(path);
        self.limiter.acquire().await;
        info!(%path, "upstream request");
        self.http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                path: path.to_string(),
                source,
            })
    }

    fn url_for(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let full_path = format!("{}{}", self.base.path().trim_end_matches('/'), path);
        url.set_path(&full_path);
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        url
    }
}
