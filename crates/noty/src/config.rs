// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};

use crate::wecom::DEFAULT_BASE_URL;

/// Process-level options for the relay.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "noty", version, about = "WeCom agent relay")]
pub struct RelayConfig {
    /// Path to the JSON configuration file (corp id, agents, listen address).
    #[arg(long, default_value = "config.json", env = "NOTY_CONFIG")]
    pub config: PathBuf,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "NOTY_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter directive (tracing `EnvFilter` syntax).
    #[arg(long, default_value = "info", env = "NOTY_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "NOTY_LOG_FORMAT")]
    pub log_format: String,

    /// Listen address. Overrides `addr` from the configuration file.
    #[arg(long, env = "NOTY_ADDR")]
    pub addr: Option<String>,

    /// Bearer token required on text-sender endpoints. If unset, those
    /// endpoints rely on network-level access control alone.
    #[arg(long, env = "NOTY_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Token refresh check interval in milliseconds.
    #[arg(
        long,
        default_value_t = 60_000,
        env = "NOTY_REFRESH_INTERVAL_MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub refresh_interval_ms: u64,

    /// Timeout for each outbound WeCom API call in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "NOTY_HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: u64,
}

impl RelayConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

/// Contents of the JSON configuration file.
///
/// PascalCase keys (`CorpID`, `Agents`, ...) from older files are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, alias = "BaseURL")]
    pub base_url: String,
    #[serde(alias = "CorpID")]
    pub corp_id: String,
    #[serde(default = "default_addr", alias = "Addr")]
    pub addr: String,
    /// Shared secret used to sign webhook callbacks.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "CallbackToken")]
    pub callback_token: Option<String>,
    #[serde(alias = "Agents")]
    pub agents: Vec<AgentConfig>,
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_owned()
}

impl FileConfig {
    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.corp_id.trim().is_empty() {
            anyhow::bail!("corp_id must be set");
        }
        if self.agents.is_empty() {
            anyhow::bail!("at least one agent must be configured");
        }
        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.id.is_empty() {
                anyhow::bail!("agent id must not be empty");
            }
            if agent.secret.is_empty() {
                anyhow::bail!("agent {}: secret must not be empty", agent.id);
            }
            if !seen.insert(agent.id.as_str()) {
                anyhow::bail!("duplicate agent id: {}", agent.id);
            }
        }
        Ok(())
    }

    /// API root, falling back to [`DEFAULT_BASE_URL`].
    pub fn base_url(&self) -> &str {
        let url = self.base_url.trim_end_matches('/');
        if url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            url
        }
    }

    /// Bindable form of `addr`; a bare `:port` listens on all interfaces.
    pub fn listen_addr(&self) -> String {
        match self.addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => self.addr.clone(),
        }
    }
}

/// One agent's identity and secret. Immutable after load.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Opaque agent id; numeric ids in the file are kept as their decimal text.
    #[serde(alias = "ID", deserialize_with = "agent_id")]
    pub id: String,
    #[serde(alias = "Secret")]
    pub secret: String,
}

impl AgentConfig {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { id: id.into(), secret: secret.into() }
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig").field("id", &self.id).field("secret", &"<redacted>").finish()
    }
}

fn agent_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
