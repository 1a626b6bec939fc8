// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: an in-process fake of the WeCom API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// `gettoken` success body.
pub fn token_ok(access_token: &str, expire_in: i64) -> Value {
    json!({ "errcode": 0, "errmsg": "ok", "access_token": access_token, "expire_in": expire_in })
}

/// Non-zero `errcode` body, valid for either endpoint.
pub fn api_err(errcode: i64, errmsg: &str) -> Value {
    json!({ "errcode": errcode, "errmsg": errmsg })
}

/// One `message/send` call as the fake saw it.
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub access_token: String,
    pub body: Value,
}

#[derive(Default)]
struct Shared {
    token_responses: Vec<Value>,
    send_responses: Vec<Value>,
    token_delay: Duration,
    token_calls: AtomicU32,
    send_calls: AtomicU32,
    token_requests: Mutex<Vec<Value>>,
    sends: Mutex<Vec<RecordedSend>>,
}

/// Pick the canned response for call `idx`, repeating the last one.
fn canned(responses: &[Value], idx: usize) -> Option<Value> {
    responses.get(idx).or_else(|| responses.last()).cloned()
}

/// Builder for [`FakeWecom`].
///
/// With no canned responses the fake issues `"<secret>-<n>"` tokens valid for
/// 7200 s and accepts every send with `msgid` `"msg-<n>"`.
#[derive(Default)]
pub struct FakeWecomBuilder {
    token_responses: Vec<Value>,
    send_responses: Vec<Value>,
    token_delay: Duration,
}

impl FakeWecomBuilder {
    pub fn token(mut self, body: Value) -> Self {
        self.token_responses.push(body);
        self
    }

    pub fn send(mut self, body: Value) -> Self {
        self.send_responses.push(body);
        self
    }

    /// Delay every `gettoken` answer.
    pub fn token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    pub async fn spawn(self) -> anyhow::Result<FakeWecom> {
        let shared = Arc::new(Shared {
            token_responses: self.token_responses,
            send_responses: self.send_responses,
            token_delay: self.token_delay,
            ..Default::default()
        });

        let app = Router::new()
            .route("/cgi-bin/gettoken", post(gettoken))
            .route("/cgi-bin/message/send", post(message_send))
            .with_state(Arc::clone(&shared));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(FakeWecom { addr, shared, handle })
    }
}

async fn gettoken(State(s): State<Arc<Shared>>, Json(req): Json<Value>) -> Json<Value> {
    let idx = s.token_calls.fetch_add(1, Ordering::SeqCst) as usize;
    s.token_requests.lock().unwrap_or_else(|e| e.into_inner()).push(req.clone());
    if !s.token_delay.is_zero() {
        tokio::time::sleep(s.token_delay).await;
    }
    let body = canned(&s.token_responses, idx).unwrap_or_else(|| {
        let secret = req["corpsecret"].as_str().unwrap_or_default();
        token_ok(&format!("{secret}-{}", idx + 1), 7200)
    });
    Json(body)
}

async fn message_send(
    State(s): State<Arc<Shared>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let idx = s.send_calls.fetch_add(1, Ordering::SeqCst) as usize;
    s.sends.lock().unwrap_or_else(|e| e.into_inner()).push(RecordedSend {
        access_token: query.get("access_token").cloned().unwrap_or_default(),
        body,
    });
    let resp = canned(&s.send_responses, idx).unwrap_or_else(
        || json!({ "errcode": 0, "errmsg": "ok", "msgid": format!("msg-{}", idx + 1) }),
    );
    Json(resp)
}

/// A fake WeCom API bound to a random local port.
pub struct FakeWecom {
    pub addr: SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl FakeWecom {
    pub fn builder() -> FakeWecomBuilder {
        FakeWecomBuilder::default()
    }

    /// Fake with default behavior only.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::builder().spawn().await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/cgi-bin", self.addr)
    }

    pub fn token_calls(&self) -> u32 {
        self.shared.token_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> u32 {
        self.shared.send_calls.load(Ordering::SeqCst)
    }

    /// Bodies of every `gettoken` call, in arrival order.
    pub fn token_requests(&self) -> Vec<Value> {
        self.shared.token_requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.shared.sends.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Drop for FakeWecom {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// An [`Application`](crate::agent::Application) whose client points at an
/// unroutable address. For tests that never reach the network.
pub fn offline_app(agent_id: &str) -> anyhow::Result<crate::agent::Application> {
    let client = crate::wecom::client::WecomClient::new(
        "http://127.0.0.1:9/cgi-bin",
        "corp-test",
        "secret",
        Duration::from_millis(100),
    )?;
    Ok(crate::agent::AgentFactory.create(
        "corp-test",
        Arc::new(client),
        crate::config::AgentConfig::new(agent_id, "secret"),
    ))
}
