// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background token refresher, one per agent.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::wecom::client::WecomClient;

/// Spawn a task that calls [`WecomClient::ensure_fresh`] every `period`
/// until `cancel` fires.
///
/// The first tick comes one `period` after spawning; callers force the
/// initial refresh themselves. Failures are logged and the cached token
/// stays in place for the next tick.
pub fn spawn_refresher(
    client: Arc<WecomClient>,
    agent_id: String,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut timer = tokio::time::interval_at(start, period);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            if let Err(e) = client.ensure_fresh().await {
                tracing::warn!(agent_id = %agent_id, err = %e, "token refresh failed");
            }
        }
        tracing::debug!(agent_id = %agent_id, "token refresher stopped");
    })
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
