//! Runtime settings, assembled once at startup from the command line and
//! environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use reqwest::Url;

use crate::client::ClientConfig;
use crate::consts::{DEFAULT_BIND, DEFAULT_FRONTEND_ORIGIN, DEFAULT_KNOWLEDGE_PATH, DEFAULT_MODEL};
use crate::engine::react::ReactConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub frontend_origin: String,
    pub knowledge_path: PathBuf,
    pub model: String,
    pub anthropic_api_key: Option<String>,
    pub client: ClientConfig,
    pub react: ReactConfig,
}

impl Settings {
    /// Defaults for everything but the provider key.
    pub fn new(sportradar_api_key: impl Into<String>) -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            knowledge_path: PathBuf::from(DEFAULT_KNOWLEDGE_PATH),
            model: DEFAULT_MODEL.to_string(),
            anthropic_api_key: None,
            client: ClientConfig::new(sportradar_api_key),
            react: ReactConfig::default(),
        }
    }

    /// Reject settings that would only fail later, mid-request.
    pub fn validate(&self) -> Result<()> {
        if self.client.api_key.trim().is_empty() {
            bail!("SPORTRADAR_API_KEY is empty");
        }
        Url::parse(&self.client.base_url)
            .with_context(|| format!("invalid upstream base URL: {}", self.client.base_url))?;
        self.bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid bind address: {}", self.bind))?;
        if self.react.max_iterations == 0 {
            bail!("max iterations must be at least 1");
        }
        if self.client.min_interval.is_zero() {
            bail!("request interval must be greater than zero");
        }
        Ok(())
    }
}
