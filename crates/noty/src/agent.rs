// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent application handles and the registry that holds them.

use std::sync::Arc;

use anyhow::Context;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::config::{AgentConfig, FileConfig, RelayConfig};
use crate::wecom::client::WecomClient;
use crate::wecom::message::{Message, SendMessageResponse};
use crate::wecom::refresh::spawn_refresher;

struct AppInner {
    corp_id: String,
    client: Arc<WecomClient>,
    agent: AgentConfig,
}

/// Everything a request handler may use to act on behalf of one agent.
///
/// Cheap to clone; read-only apart from sending through [`Application::send`].
#[derive(Clone)]
pub struct Application {
    inner: Arc<AppInner>,
}

impl Application {
    pub fn corp_id(&self) -> &str {
        &self.inner.corp_id
    }

    pub fn agent(&self) -> &AgentConfig {
        &self.inner.agent
    }

    pub fn agent_id(&self) -> &str {
        &self.inner.agent.id
    }

    pub fn client(&self) -> &Arc<WecomClient> {
        &self.inner.client
    }

    /// Text message from this agent, addressed to everyone by default.
    pub fn text(&self, content: impl Into<String>) -> Message {
        Message::text(self.agent_id(), content)
    }

    pub async fn send(&self, msg: &Message) -> crate::wecom::error::Result<SendMessageResponse> {
        self.inner.client.send(msg).await
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("corp_id", &self.inner.corp_id)
            .field("agent_id", &self.inner.agent.id)
            .finish_non_exhaustive()
    }
}

/// Binds a configured client to its agent.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgentFactory;

impl AgentFactory {
    pub fn create(
        &self,
        corp_id: impl Into<String>,
        client: Arc<WecomClient>,
        agent: AgentConfig,
    ) -> Application {
        Application { inner: Arc::new(AppInner { corp_id: corp_id.into(), client, agent }) }
    }
}

/// Agents in configuration order, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct AgentRegistry {
    apps: IndexMap<String, Application>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `app`, returning any handle previously held under its id.
    pub fn insert(&mut self, app: Application) -> Option<Application> {
        self.apps.insert(app.agent_id().to_owned(), app)
    }

    pub fn get(&self, agent_id: &str) -> Option<&Application> {
        self.apps.get(agent_id)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Application> {
        self.apps.values()
    }
}

/// Build one client per configured agent, force its first token fetch, attach
/// a refresher, and register the bound handle.
///
/// Any agent whose first fetch fails aborts the whole bootstrap; refreshers
/// already started are cancelled. Refreshers stop when `cancel` fires.
pub async fn bootstrap(
    file: &FileConfig,
    config: &RelayConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<AgentRegistry> {
    let factory = AgentFactory;
    let agents_cancel = cancel.child_token();
    let mut registry = AgentRegistry::new();

    for agent in &file.agents {
        let client = match start_client(file, config, agent).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                agents_cancel.cancel();
                return Err(e);
            }
        };
        spawn_refresher(
            Arc::clone(&client),
            agent.id.clone(),
            config.refresh_interval(),
            agents_cancel.clone(),
        );
        registry.insert(factory.create(&file.corp_id, client, agent.clone()));
        tracing::info!(agent_id = %agent.id, "agent registered");
    }

    Ok(registry)
}

async fn start_client(
    file: &FileConfig,
    config: &RelayConfig,
    agent: &AgentConfig,
) -> anyhow::Result<WecomClient> {
    let client =
        WecomClient::new(file.base_url(), &file.corp_id, &agent.secret, config.http_timeout())
            .with_context(|| format!("agent {}: build client", agent.id))?;
    client
        .ensure_fresh()
        .await
        .with_context(|| format!("agent {}: initial token fetch", agent.id))?;
    Ok(client)
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
