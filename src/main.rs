use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statscout::approval::Turn;
use statscout::banner::{BannerInfo, print_banner};
use statscout::client::ClientConfig;
use statscout::config::Settings;
use statscout::consts::{
    DEFAULT_ACCESS_LEVEL, DEFAULT_BIND, DEFAULT_FRONTEND_ORIGIN, DEFAULT_KNOWLEDGE_PATH,
    DEFAULT_LANGUAGE, DEFAULT_MODEL, base_url,
};
use statscout::engine::react::ReactConfig;
use statscout::server::{self, AppState};

#[derive(Parser)]
#[command(
    name = "statscout",
    version,
    about = "Cricket analytics assistant with live Sportradar data."
)]
struct Cli {
    /// Sportradar API key
    #[arg(long, env = "SPORTRADAR_API_KEY", hide_env_values = true)]
    sportradar_api_key: String,

    /// Sportradar access level (t = trial, p = production)
    #[arg(long, env = "STATSCOUT_ACCESS_LEVEL", default_value = DEFAULT_ACCESS_LEVEL)]
    access_level: String,

    /// Sportradar response language
    #[arg(long, env = "STATSCOUT_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Override the full upstream base URL
    #[arg(long, env = "STATSCOUT_BASE_URL")]
    base_url: Option<String>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    /// Model name
    #[arg(long, env = "STATSCOUT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Address to listen on
    #[arg(short, long, env = "STATSCOUT_BIND", default_value = DEFAULT_BIND)]
    bind: String,

    /// Origin allowed to call the API from a browser
    #[arg(long, env = "STATSCOUT_FRONTEND_ORIGIN", default_value = DEFAULT_FRONTEND_ORIGIN)]
    frontend_origin: String,

    /// Scouting knowledge file (created on first write)
    #[arg(short, long, env = "STATSCOUT_KNOWLEDGE", default_value = DEFAULT_KNOWLEDGE_PATH)]
    knowledge: PathBuf,

    /// Maximum ReAct loop iterations before giving up
    #[arg(short, long, default_value_t = 20)]
    max_iterations: usize,

    /// Tool execution timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 10)]
    request_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "STATSCOUT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "STATSCOUT_LOG_JSON")]
    log_json: bool,

    /// Answer a single message, print its events as JSON lines and exit
    #[arg(short, long)]
    run: Option<String>,
}

impl Cli {
    fn settings(&self) -> Settings {
        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| base_url(&self.access_level, &self.language));
        Settings {
            bind: self.bind.clone(),
            frontend_origin: self.frontend_origin.clone(),
            knowledge_path: self.knowledge.clone(),
            model: self.model.clone(),
            anthropic_api_key: self.anthropic_api_key.clone(),
            client: ClientConfig {
                base_url,
                timeout: Duration::from_secs(self.request_timeout),
                ..ClientConfig::new(self.sportradar_api_key.clone())
            },
            react: ReactConfig {
                max_iterations: self.max_iterations,
                tool_timeout: Duration::from_secs(self.timeout),
            },
        }
    }
}

fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let level = level
        .parse::<tracing::Level>()
        .context("invalid log level")?;
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json)?;

    let settings = cli.settings();
    settings.validate()?;
    let state = AppState::from_settings(&settings).await?;

    // Single turn mode
    if let Some(message) = cli.run {
        let mut events = state.bridge.start(Turn::new(message));
        while let Some(event) = events.next().await {
            println!("{}", serde_json::to_string(&event.to_wire())?);
        }
        return Ok(());
    }

    print_banner(&BannerInfo {
        model: &settings.model,
        bind: &settings.bind,
        upstream: &settings.client.base_url,
        knowledge: &settings.knowledge_path,
        frontend_origin: &settings.frontend_origin,
    });

    let app = server::router(state, &settings.frontend_origin)?;
    tokio::select! {
        result = server::serve(&settings.bind, app) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}
