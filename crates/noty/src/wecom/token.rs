// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached access token for one agent.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Subtracted from every reported lifetime so renewal happens before the
/// platform starts rejecting the token.
pub const SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Longest lifetime accepted from `gettoken`; larger values are clamped.
pub const MAX_TTL_SECS: i64 = 7 * 24 * 3600;

/// An access token and the instant it stops being usable locally.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at: Instant,
}

impl Token {
    /// Build a token from a `gettoken` answer received at `now`.
    ///
    /// A lifetime at or below [`SAFETY_MARGIN`] yields a token that is
    /// already unusable, so the next refresh attempt fetches again. A lifetime
    /// above [`MAX_TTL_SECS`] is treated as [`MAX_TTL_SECS`].
    pub fn issued(value: String, ttl_secs: i64, now: Instant) -> Self {
        let ttl = Duration::from_secs(ttl_secs.clamp(0, MAX_TTL_SECS) as u64);
        let expires_at = ttl
            .checked_sub(SAFETY_MARGIN)
            .and_then(|remaining| now.checked_add(remaining))
            .unwrap_or(now);
        Self { value, expires_at }
    }

    pub fn is_usable_at(&self, now: Instant) -> bool {
        !self.value.is_empty() && now < self.expires_at
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Single-slot token store.
///
/// Readers always get a whole `(value, expires_at)` pair from one refresh.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: RwLock<Option<Token>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current token, if any was ever issued.
    pub async fn current(&self) -> Option<Token> {
        self.slot.read().await.clone()
    }

    pub async fn is_usable_at(&self, now: Instant) -> bool {
        self.slot.read().await.as_ref().is_some_and(|t| t.is_usable_at(now))
    }

    /// Bare token value for request signing. Empty when nothing was issued yet.
    pub async fn value(&self) -> String {
        self.slot.read().await.as_ref().map(|t| t.value.clone()).unwrap_or_default()
    }

    pub async fn replace(&self, token: Token) {
        *self.slot.write().await = Some(token);
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
