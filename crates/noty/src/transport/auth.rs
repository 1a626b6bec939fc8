// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::RelayError;
use crate::state::RelayState;

/// Path prefix of the outbound send trigger, the only bearer-protected route.
pub const TEXT_SENDER_PREFIX: &str = "/qiye-wechat/text-senders/";

/// Constant-time string comparison to prevent timing side-channel attacks.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate a Bearer token from HTTP headers.
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), RelayError> {
    let expected = match expected {
        Some(tok) => tok,
        None => return Ok(()),
    };

    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(RelayError::Unauthorized)?;

    let token = header.strip_prefix("Bearer ").ok_or(RelayError::Unauthorized)?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(RelayError::Unauthorized)
    }
}

/// Axum middleware that enforces Bearer token authentication on text senders.
///
/// Webhook routes are authenticated by signature instead, and health is open.
pub async fn auth_layer(
    state: State<Arc<RelayState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !req.uri().path().starts_with(TEXT_SENDER_PREFIX) {
        return next.run(req).await;
    }

    if let Err(code) = validate_bearer(req.headers(), state.auth_token.as_deref()) {
        tracing::warn!(path = %req.uri().path(), "rejected unauthenticated send request");
        let body = crate::error::ErrorResponse { error: code.to_error_body("unauthorized") };
        return (
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::UNAUTHORIZED),
            axum::Json(body),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
