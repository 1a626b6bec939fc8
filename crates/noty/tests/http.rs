// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the relay HTTP API.
//!
//! Uses `axum_test::TestServer` in front of a fake WeCom API.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use clap::Parser;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use noty::agent::bootstrap;
use noty::config::{AgentConfig, FileConfig, RelayConfig};
use noty::state::RelayState;
use noty::test_support::{api_err, FakeWecom};
use noty::transport::build_router;
use noty::transport::verify::{signature, SignatureVerifier, StaticVerifier, Verifier};

const CALLBACK_TOKEN: &str = "cb-token";

struct Harness {
    server: TestServer,
    fake: FakeWecom,
    cancel: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn harness_with(
    fake: FakeWecom,
    verifier: Arc<dyn Verifier>,
    auth_token: Option<&str>,
) -> anyhow::Result<Harness> {
    let file = FileConfig {
        base_url: fake.base_url(),
        corp_id: "corp-1".to_owned(),
        addr: "127.0.0.1:0".to_owned(),
        callback_token: Some(CALLBACK_TOKEN.to_owned()),
        agents: vec![
            AgentConfig::new("1000002", "secret-a"),
            AgentConfig::new("1000003", "secret-b"),
        ],
    };
    let config = RelayConfig::parse_from(["noty"]);
    let cancel = CancellationToken::new();
    let registry = bootstrap(&file, &config, &cancel).await?;
    let state = Arc::new(RelayState::new(registry, verifier, auth_token.map(str::to_owned)));
    let server = TestServer::new(build_router(state)).expect("failed to create test server");
    Ok(Harness { server, fake, cancel })
}

async fn harness() -> anyhow::Result<Harness> {
    harness_with(FakeWecom::spawn().await?, Arc::new(SignatureVerifier::new(CALLBACK_TOKEN)), None)
        .await
}

fn signed_query(payload: &str) -> String {
    let sig = signature(CALLBACK_TOKEN, "1700000000", "n0nce", payload);
    format!("msg_signature={sig}&timestamp=1700000000&nonce=n0nce")
}

// -- Health -------------------------------------------------------------------

#[tokio::test]
async fn health_reports_agent_count() -> anyhow::Result<()> {
    let h = harness().await?;
    let resp = h.server.get("/api/v1/health").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "running");
    assert_eq!(body["agents"], 2);
    Ok(())
}

// -- Unknown agents -----------------------------------------------------------

#[tokio::test]
async fn unknown_agent_returns_404() -> anyhow::Result<()> {
    let h = harness().await?;

    let resp = h.server.get("/qiye-wechat/agents/9999").await;
    resp.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "AGENT_NOT_FOUND");

    let resp = h.server.post("/qiye-wechat/agents/9999").text("<xml/>").await;
    resp.assert_status(StatusCode::NOT_FOUND);

    let resp =
        h.server.post("/qiye-wechat/text-senders/9999").json(&json!({ "content": "hi" })).await;
    resp.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(h.fake.send_calls(), 0);
    Ok(())
}

// -- Webhook verification -----------------------------------------------------

#[tokio::test]
async fn url_verification_echoes_signed_echostr() -> anyhow::Result<()> {
    let h = harness().await?;
    let path = format!("/qiye-wechat/agents/1000002?{}&echostr=hello123", signed_query("hello123"));
    let resp = h.server.get(&path).await;
    resp.assert_status_ok();
    assert_eq!(resp.text(), "hello123");
    Ok(())
}

#[tokio::test]
async fn url_verification_rejects_bad_signature() -> anyhow::Result<()> {
    let h = harness().await?;
    let path = format!("/qiye-wechat/agents/1000002?{}&echostr=tampered", signed_query("hello123"));
    let resp = h.server.get(&path).await;
    resp.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "REJECTED");
    Ok(())
}

#[tokio::test]
async fn inbound_callback_is_acknowledged() -> anyhow::Result<()> {
    let h = harness().await?;
    let body = "<xml><ToUserName><![CDATA[corp-1]]></ToUserName>\
                <Encrypt><![CDATA[Y2lwaGVy]]></Encrypt></xml>";
    let path = format!("/qiye-wechat/agents/1000003?{}", signed_query("Y2lwaGVy"));
    let resp = h.server.post(&path).text(body).await;
    resp.assert_status_ok();
    assert_eq!(resp.text(), "success");
    Ok(())
}

#[tokio::test]
async fn unsigned_callback_is_rejected() -> anyhow::Result<()> {
    let h = harness().await?;
    let resp = h
        .server
        .post("/qiye-wechat/agents/1000003")
        .text("<xml><Encrypt>abc</Encrypt></xml>")
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn rejecting_verifier_refuses_everything() -> anyhow::Result<()> {
    let h = harness_with(
        FakeWecom::spawn().await?,
        Arc::new(StaticVerifier::rejecting("callback verification not configured")),
        None,
    )
    .await?;
    let path = format!("/qiye-wechat/agents/1000002?{}&echostr=hello123", signed_query("hello123"));
    let resp = h.server.get(&path).await;
    resp.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["message"], "callback verification not configured");
    Ok(())
}

// -- Text sender --------------------------------------------------------------

#[tokio::test]
async fn text_send_defaults_to_everyone() -> anyhow::Result<()> {
    let h = harness().await?;
    let resp = h
        .server
        .post("/qiye-wechat/text-senders/1000002")
        .json(&json!({ "content": "deploy ok" }))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["sent"], true);
    assert_eq!(body["msgid"], "msg-1");

    let sends = h.fake.sends();
    assert_eq!(sends.len(), 1);
    // Agent 1000002 was bootstrapped first, so it holds the first token.
    assert_eq!(sends[0].access_token, "secret-a-1");
    assert_eq!(
        sends[0].body,
        json!({
            "touser": "@all",
            "msgtype": "text",
            "agentid": 1000002,
            "text": { "content": "deploy ok" },
        })
    );
    Ok(())
}

#[tokio::test]
async fn text_send_uses_the_addressed_agent() -> anyhow::Result<()> {
    let h = harness().await?;
    let resp = h
        .server
        .post("/qiye-wechat/text-senders/1000003")
        .json(&json!({ "content": "hi", "touser": "alice|bob", "totag": "7", "safe": true }))
        .await;
    resp.assert_status_ok();

    let sends = h.fake.sends();
    assert_eq!(sends[0].access_token, "secret-b-2");
    assert_eq!(sends[0].body["agentid"], 1000003);
    assert_eq!(sends[0].body["touser"], "alice|bob");
    assert_eq!(sends[0].body["totag"], "7");
    assert_eq!(sends[0].body["safe"], 1);
    assert!(sends[0].body.get("toparty").is_none());
    Ok(())
}

#[tokio::test]
async fn text_send_rejects_empty_content() -> anyhow::Result<()> {
    let h = harness().await?;
    let resp =
        h.server.post("/qiye-wechat/text-senders/1000002").json(&json!({ "content": "  " })).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(h.fake.send_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn text_send_surfaces_remote_rejection() -> anyhow::Result<()> {
    let fake = FakeWecom::builder()
        .send(json!({
            "errcode": 81013,
            "errmsg": "user & party & tag all invalid",
            "invaliduser": "u1|u2",
        }))
        .spawn()
        .await?;
    let h = harness_with(fake, Arc::new(SignatureVerifier::new(CALLBACK_TOKEN)), None).await?;

    let resp = h
        .server
        .post("/qiye-wechat/text-senders/1000002")
        .json(&json!({ "content": "hi", "touser": "u1|u2" }))
        .await;
    resp.assert_status(StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(message.contains("u1|u2"), "got: {message}");
    Ok(())
}

#[tokio::test]
async fn text_send_reports_expired_token_without_retrying() -> anyhow::Result<()> {
    let fake = FakeWecom::builder().send(api_err(42001, "access_token expired")).spawn().await?;
    let h = harness_with(fake, Arc::new(SignatureVerifier::new(CALLBACK_TOKEN)), None).await?;

    let resp =
        h.server.post("/qiye-wechat/text-senders/1000002").json(&json!({ "content": "hi" })).await;
    resp.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(h.fake.send_calls(), 1);
    Ok(())
}

// -- Auth ---------------------------------------------------------------------

#[tokio::test]
async fn text_send_requires_bearer_when_configured() -> anyhow::Result<()> {
    let h = harness_with(
        FakeWecom::spawn().await?,
        Arc::new(SignatureVerifier::new(CALLBACK_TOKEN)),
        Some("relay-secret"),
    )
    .await?;

    let resp =
        h.server.post("/qiye-wechat/text-senders/1000002").json(&json!({ "content": "hi" })).await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(h.fake.send_calls(), 0);

    let resp = h
        .server
        .post("/qiye-wechat/text-senders/1000002")
        .authorization_bearer("relay-secret")
        .json(&json!({ "content": "hi" }))
        .await;
    resp.assert_status_ok();
    assert_eq!(h.fake.send_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn webhook_and_health_skip_bearer_auth() -> anyhow::Result<()> {
    let h = harness_with(
        FakeWecom::spawn().await?,
        Arc::new(SignatureVerifier::new(CALLBACK_TOKEN)),
        Some("relay-secret"),
    )
    .await?;

    h.server.get("/api/v1/health").await.assert_status_ok();
    let path = format!("/qiye-wechat/agents/1000002?{}&echostr=hello123", signed_query("hello123"));
    h.server.get(&path).await.assert_status_ok();
    Ok(())
}
