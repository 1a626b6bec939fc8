// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook verification capability.
//!
//! Handlers only ask a [`Verifier`] for a verdict; the cryptography behind it
//! is pluggable. [`SignatureVerifier`] checks the `msg_signature` the
//! platform attaches; payload decryption is left to richer implementations.

use serde::Deserialize;

use crate::agent::Application;
use crate::transport::auth::constant_time_eq;

/// Query parameters the platform attaches to every callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub msg_signature: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub nonce: String,
    /// Present only on the one-time URL verification GET.
    #[serde(default)]
    pub echostr: Option<String>,
}

/// An inbound callback as seen by a verifier.
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    pub query: CallbackQuery,
    pub body: String,
}

impl CallbackRequest {
    /// The signed payload: `echostr` for URL verification, otherwise the
    /// `<Encrypt>` element of the XML body.
    pub fn payload(&self) -> Option<&str> {
        match self.query.echostr.as_deref() {
            Some(echo) => Some(echo),
            None => extract_encrypt(&self.body),
        }
    }
}

/// Outcome of verifying a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The request is authentic. `echo` is the body to answer URL
    /// verification with.
    Accepted { echo: String },
    Rejected(String),
}

/// Decides whether an inbound callback for `app` is authentic.
pub trait Verifier: Send + Sync {
    fn verify(&self, app: &Application, req: &CallbackRequest) -> Verdict;
}

/// Accepts or rejects everything. For development and tests.
#[derive(Debug, Clone)]
pub struct StaticVerifier {
    rejection: Option<String>,
}

impl StaticVerifier {
    /// Accept every request, echoing its payload back.
    pub fn accepting() -> Self {
        Self { rejection: None }
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self { rejection: Some(reason.into()) }
    }
}

impl Verifier for StaticVerifier {
    fn verify(&self, _app: &Application, req: &CallbackRequest) -> Verdict {
        match &self.rejection {
            Some(reason) => Verdict::Rejected(reason.clone()),
            None => Verdict::Accepted { echo: req.payload().unwrap_or_default().to_owned() },
        }
    }
}

/// Checks `msg_signature = sha1(sort(token, timestamp, nonce, payload))`.
///
/// The accepted echo is the payload itself, undecrypted.
#[derive(Clone)]
pub struct SignatureVerifier {
    token: String,
}

impl SignatureVerifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

impl Verifier for SignatureVerifier {
    fn verify(&self, _app: &Application, req: &CallbackRequest) -> Verdict {
        let Some(payload) = req.payload() else {
            return Verdict::Rejected("missing payload".to_owned());
        };
        let q = &req.query;
        if q.msg_signature.is_empty() || q.timestamp.is_empty() || q.nonce.is_empty() {
            return Verdict::Rejected("missing signature parameters".to_owned());
        }
        let expected = signature(&self.token, &q.timestamp, &q.nonce, payload);
        if constant_time_eq(&expected, &q.msg_signature.to_ascii_lowercase()) {
            Verdict::Accepted { echo: payload.to_owned() }
        } else {
            Verdict::Rejected("signature mismatch".to_owned())
        }
    }
}

/// Lowercase hex SHA-1 over the lexicographically sorted parts.
pub fn signature(token: &str, timestamp: &str, nonce: &str, payload: &str) -> String {
    let mut parts = [token, timestamp, nonce, payload];
    parts.sort_unstable();
    let joined = parts.concat();
    let digest = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, joined.as_bytes());
    digest.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}

/// Text of the `<Encrypt>` element, with any CDATA wrapper removed.
fn extract_encrypt(body: &str) -> Option<&str> {
    let start = body.find("<Encrypt>")? + "<Encrypt>".len();
    let len = body[start..].find("</Encrypt>")?;
    let inner = body[start..start + len].trim();
    Some(
        inner
            .strip_prefix("<![CDATA[")
            .and_then(|s| s.strip_suffix("]]>"))
            .unwrap_or(inner),
    )
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
