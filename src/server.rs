//! HTTP surface: the chat stream, the match list and a health check.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Json, State};
use axum::http::{HeaderValue, Method, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::Router;
use chrono::Local;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::approval::Turn;
use crate::bridge::ExecutionBridge;
use crate::client::{ApiClient, FetchObserver};
use crate::config::Settings;
use crate::engine::react::ReactEngine;
use crate::knowledge::KnowledgeBase;
use crate::matches::{MatchList, build_match_list};
use crate::thinker::anthropic::AnthropicThinker;
use crate::tools::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<ExecutionBridge>,
    pub client: Arc<ApiClient>,
}

impl AppState {
    /// Wire the production stack: one shared client feeding the knowledge
    /// store, the cricket tools and an Anthropic-backed ReAct engine.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let knowledge = Arc::new(KnowledgeBase::load(&settings.knowledge_path)?);
        let client = Arc::new(
            ApiClient::new(settings.client.clone())?
                .with_observer(Arc::clone(&knowledge) as Arc<dyn FetchObserver>),
        );
        let tools = Arc::new(ToolRegistry::cricket(Arc::clone(&client), knowledge).await);
        let thinker = Arc::new(AnthropicThinker::new(
            Some(settings.model.clone()),
            settings.anthropic_api_key.clone(),
        ));
        let engine = Arc::new(ReactEngine::new(thinker, tools, settings.react.clone()));

        Ok(Self {
            bridge: Arc::new(ExecutionBridge::new(engine)),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let turn = Turn::new(request.message);
    info!(approved = turn.is_approved(), "chat turn started");

    let events = state
        .bridge
        .start(turn)
        .map(|event| Event::default().json_data(event.to_wire()));
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn match_list(State(state): State<AppState>) -> Json<MatchList> {
    Json(build_match_list(&state.client, Local::now()).await)
}

async fn health() -> &'static str {
    "OK"
}

pub fn router(state: AppState, frontend_origin: &str) -> Result<Router> {
    let origin = HeaderValue::from_str(frontend_origin)
        .with_context(|| format!("invalid frontend origin: {}", frontend_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Ok(Router::new()
        .route("/chat", post(chat))
        .route("/api/match-list", get(match_list))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, app: Router) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "listening");
    axum::serve(listener, app).await.context("server error")
}
