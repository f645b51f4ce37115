//! In-process stand-in for the upstream provider.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tokio::time::Instant;

use statscout::client::{ApiClient, ClientConfig};

pub const PREFIX: &str = "/cricket-t2/en";
pub const API_KEY: &str = "test-key";

#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub query: String,
    pub at: Instant,
}

#[derive(Default)]
struct Inner {
    routes: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    delays: Mutex<HashMap<String, Duration>>,
    hits: Mutex<Vec<Hit>>,
}

/// Scripted responses per path. Each call takes the next response; the
/// last one repeats. Unscripted paths answer 404.
pub struct FakeUpstream {
    pub addr: SocketAddr,
    inner: Arc<Inner>,
}

async fn handle(State(inner): State<Arc<Inner>>, uri: Uri) -> Response {
    let path = uri
        .path()
        .strip_prefix(PREFIX)
        .unwrap_or(uri.path())
        .to_string();
    inner.hits.lock().unwrap().push(Hit {
        path: path.clone(),
        query: uri.query().unwrap_or_default().to_string(),
        at: Instant::now(),
    });

    let delay = inner.delays.lock().unwrap().get(&path).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let next = {
        let mut routes = inner.routes.lock().unwrap();
        match routes.get_mut(&path) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    };
    match next {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap(),
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

impl FakeUpstream {
    pub async fn start() -> Self {
        let inner = Arc::new(Inner::default());
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&inner));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, inner }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, PREFIX)
    }

    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        self.inner
            .routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back((status, body.into()));
    }

    /// Hold every response for `path` this long before answering.
    pub fn stall(&self, path: &str, delay: Duration) {
        self.inner
            .delays
            .lock()
            .unwrap()
            .insert(path.to_string(), delay);
    }

    pub fn respond_json(&self, path: &str, body: &Value) {
        self.respond(path, 200, body.to_string());
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.inner.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.hits().iter().filter(|h| h.path == path).count()
    }

    /// Client settings with short pacing so tests run quickly.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url(),
            min_interval: Duration::from_millis(50),
            quota_backoff: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
            ..ClientConfig::new(API_KEY)
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.config()).unwrap()
    }
}

pub mod paths {
    pub const LIVE: &str = "/schedules/live/schedule.json";

    pub fn summary(id: &str) -> String {
        format!("/matches/{}/summary.json", id)
    }

    pub fn player(id: &str) -> String {
        format!("/players/{}/profile.json", id)
    }

    pub fn team(id: &str) -> String {
        format!("/teams/{}/profile.json", id)
    }

    pub fn daily(date: chrono::NaiveDate) -> String {
        format!("/schedules/{}/schedule.json", date.format("%Y-%m-%d"))
    }
}
