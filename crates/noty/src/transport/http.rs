// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the relay.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::agent::Application;
use crate::error::RelayError;
use crate::state::RelayState;
use crate::transport::verify::{CallbackQuery, CallbackRequest, Verdict};

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub agents: usize,
}

/// Body of `POST /qiye-wechat/text-senders/{id}`.
///
/// Recipient lists are `|`-separated; with none given the message goes to
/// every member visible to the agent.
#[derive(Debug, Deserialize)]
pub struct TextSendRequest {
    pub content: String,
    #[serde(default)]
    pub touser: String,
    #[serde(default)]
    pub toparty: String,
    #[serde(default)]
    pub totag: String,
    #[serde(default)]
    pub safe: bool,
}

#[derive(Debug, Serialize)]
pub struct TextSendResponse {
    pub sent: bool,
    pub msgid: String,
}

/// Body returned for an accepted inbound callback.
pub const CALLBACK_ACK: &str = "success";

// -- Handlers -----------------------------------------------------------------

fn agent_app<'a>(s: &'a RelayState, id: &str) -> Result<&'a Application, Box<Response>> {
    s.registry.get(id).ok_or_else(|| {
        let message = format!("unknown agent: {id}");
        Box::new(RelayError::AgentNotFound.to_http_response(message).into_response())
    })
}

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), agents: s.registry.len() })
}

/// `GET /qiye-wechat/agents/{id}`: one-time callback URL verification.
pub async fn verify_url(
    State(s): State<Arc<RelayState>>,
    Path(id): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    let app = match agent_app(&s, &id) {
        Ok(app) => app,
        Err(resp) => return *resp,
    };

    let req = CallbackRequest { query, body: String::new() };
    match s.verifier.verify(app, &req) {
        Verdict::Accepted { echo } => {
            tracing::info!(agent_id = %id, "callback URL verified");
            echo.into_response()
        }
        Verdict::Rejected(reason) => {
            tracing::warn!(agent_id = %id, reason = %reason, "callback URL verification rejected");
            RelayError::Rejected.to_http_response(reason).into_response()
        }
    }
}

/// `POST /qiye-wechat/agents/{id}`: inbound message callback.
pub async fn callback(
    State(s): State<Arc<RelayState>>,
    Path(id): Path<String>,
    Query(query): Query<CallbackQuery>,
    body: String,
) -> impl IntoResponse {
    let app = match agent_app(&s, &id) {
        Ok(app) => app,
        Err(resp) => return *resp,
    };

    let bytes = body.len();
    let req = CallbackRequest { query, body };
    match s.verifier.verify(app, &req) {
        Verdict::Accepted { .. } => {
            tracing::info!(agent_id = %id, bytes, "inbound callback accepted");
            CALLBACK_ACK.into_response()
        }
        Verdict::Rejected(reason) => {
            tracing::warn!(agent_id = %id, reason = %reason, "inbound callback rejected");
            RelayError::Rejected.to_http_response(reason).into_response()
        }
    }
}

/// `POST /qiye-wechat/text-senders/{id}`: send a text message as the agent.
pub async fn send_text(
    State(s): State<Arc<RelayState>>,
    Path(id): Path<String>,
    Json(req): Json<TextSendRequest>,
) -> impl IntoResponse {
    let app = match agent_app(&s, &id) {
        Ok(app) => app,
        Err(resp) => return *resp,
    };

    if req.content.trim().is_empty() {
        return RelayError::BadRequest.to_http_response("content must not be empty").into_response();
    }

    let msg = app
        .text(req.content)
        .to(&req.touser, &req.toparty, &req.totag)
        .confidential(req.safe);
    match app.send(&msg).await {
        Ok(resp) => {
            tracing::info!(agent_id = %id, msgid = %resp.msgid, "text message sent");
            Json(TextSendResponse { sent: true, msgid: resp.msgid }).into_response()
        }
        Err(e) => {
            tracing::warn!(agent_id = %id, err = %e, "text message send failed");
            RelayError::UpstreamError.to_http_response(e.to_string()).into_response()
        }
    }
}
