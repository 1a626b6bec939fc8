// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Noty: a relay between WeCom agents and internal systems.
//!
//! Each configured agent gets its own API client with a self-refreshing
//! access token, a webhook endpoint, and an outbound text-send endpoint.

pub mod agent;
pub mod config;
pub mod error;
pub mod state;
pub mod test_support;
pub mod transport;
pub mod wecom;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{FileConfig, RelayConfig};
use crate::state::RelayState;
use crate::transport::build_router;
use crate::transport::verify::{SignatureVerifier, StaticVerifier, Verifier};

/// Run the relay until ctrl-c.
///
/// Configuration errors, an initial token failure for any agent, or a failed
/// bind are returned before anything is served.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let file = FileConfig::load(&config.config)?;
    file.validate().with_context(|| format!("invalid config {}", config.config.display()))?;

    let shutdown = CancellationToken::new();
    let registry = agent::bootstrap(&file, &config, &shutdown).await?;

    let verifier: Arc<dyn Verifier> = match file.callback_token {
        Some(ref token) => Arc::new(SignatureVerifier::new(token.clone())),
        None => {
            tracing::warn!("no callback_token configured; webhook callbacks will be rejected");
            Arc::new(StaticVerifier::rejecting("callback verification not configured"))
        }
    };

    let agents = registry.len();
    let state = Arc::new(RelayState::new(registry, verifier, config.auth_token.clone()));

    let addr = config.addr.clone().unwrap_or_else(|| file.listen_addr());
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("bind {addr}"))?;
    if config.auth_token.is_some() {
        tracing::info!("noty listening on {addr} ({agents} agents, send auth enabled)");
    } else {
        tracing::info!("noty listening on {addr} ({agents} agents)");
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
            shutdown.cancel();
        });
    }

    let router = build_router(state);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;
    shutdown.cancel();
    served?;

    Ok(())
}
