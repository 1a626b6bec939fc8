// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for one agent's credential pair.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::wecom::error::{Result, WecomError};
use crate::wecom::message::{Message, SendMessageResponse};
use crate::wecom::token::{Token, TokenCache};

#[derive(Debug, Serialize)]
struct GetTokenRequest<'a> {
    corpid: &'a str,
    corpsecret: &'a str,
}

#[derive(Debug, Deserialize)]
struct GetTokenResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    access_token: String,
    #[serde(default, alias = "expires_in")]
    expire_in: i64,
}

/// WeCom API client bound to one `(corp_id, secret)` pair.
///
/// Owns the agent's [`TokenCache`]; nothing else writes to it.
pub struct WecomClient {
    base_url: String,
    corp_id: String,
    corp_secret: String,
    token: TokenCache,
    /// Serializes refreshes so concurrent stale callers issue one `gettoken`.
    refresh: Mutex<()>,
    client: Client,
}

impl WecomClient {
    pub fn new(
        base_url: impl Into<String>,
        corp_id: impl Into<String>,
        corp_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        crate::wecom::install_crypto_provider();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            corp_id: corp_id.into(),
            corp_secret: corp_secret.into(),
            token: TokenCache::new(),
            refresh: Mutex::new(()),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn corp_id(&self) -> &str {
        &self.corp_id
    }

    /// Snapshot of the cached token.
    pub async fn token(&self) -> Option<Token> {
        self.token.current().await
    }

    /// Call `gettoken`, returning the token and its reported lifetime in seconds.
    pub async fn get_token(&self) -> Result<(String, i64)> {
        let req = GetTokenRequest { corpid: &self.corp_id, corpsecret: &self.corp_secret };
        let resp = self.client.post(self.url("/gettoken")).json(&req).send().await?;
        let bytes = resp.error_for_status()?.bytes().await?;
        let body: GetTokenResponse = serde_json::from_slice(&bytes)?;
        if body.errcode != 0 {
            return Err(WecomError::Remote { code: body.errcode, message: body.errmsg });
        }
        Ok((body.access_token, body.expire_in))
    }

    /// Make sure a usable token is cached, fetching one only when needed.
    pub async fn ensure_fresh(&self) -> Result<()> {
        self.ensure_fresh_at(Instant::now()).await
    }

    /// [`ensure_fresh`](Self::ensure_fresh) evaluated against `now`.
    ///
    /// On failure the cached token is left as it was.
    pub async fn ensure_fresh_at(&self, now: Instant) -> Result<()> {
        if self.token.is_usable_at(now).await {
            return Ok(());
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if self.token.is_usable_at(now).await {
            return Ok(());
        }

        let (value, ttl) = self.get_token().await?;
        self.token.replace(Token::issued(value, ttl, now)).await;
        tracing::debug!(ttl_secs = ttl, "access token refreshed");
        Ok(())
    }

    /// POST `msg` to `message/send` with whatever token is cached right now.
    ///
    /// Does not refresh first; the scheduler keeps the cache fresh.
    pub async fn send(&self, msg: &Message) -> Result<SendMessageResponse> {
        let access_token = self.token.value().await;
        let resp = self
            .client
            .post(self.url("/message/send"))
            .query(&[("access_token", access_token.as_str())])
            .json(msg)
            .send()
            .await?;
        let bytes = resp.error_for_status()?.bytes().await?;
        let body: SendMessageResponse = serde_json::from_slice(&bytes)?;
        if body.errcode != 0 {
            return Err(WecomError::Send {
                code: body.errcode,
                message: body.errmsg,
                invalid_user: body.invaliduser,
                invalid_party: body.invalidparty,
                invalid_tag: body.invalidtag,
            });
        }
        Ok(body)
    }
}

impl std::fmt::Debug for WecomClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WecomClient")
            .field("base_url", &self.base_url)
            .field("corp_id", &self.corp_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
