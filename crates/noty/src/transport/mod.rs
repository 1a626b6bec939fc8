// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: per-agent webhook and send endpoints.

pub mod auth;
pub mod http;
pub mod verify;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::RelayState;

/// Build the axum `Router` with all relay routes.
pub fn build_router(state: Arc<RelayState>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(http::health))
        // Webhook: URL verification and inbound callbacks (signature-verified)
        .route("/qiye-wechat/agents/{id}", get(http::verify_url).post(http::callback))
        // Outbound send trigger (bearer auth when configured)
        .route("/qiye-wechat/text-senders/{id}", post(http::send_text))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
