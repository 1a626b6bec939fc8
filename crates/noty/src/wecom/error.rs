// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by calls to the WeCom API.

use thiserror::Error;

/// Failure of a single remote call.
#[derive(Debug, Error)]
pub enum WecomError {
    /// Request URLs are stripped; the send URL carries the access token.
    #[error("transport: {0}")]
    Transport(reqwest::Error),

    #[error("decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// `gettoken` answered with a non-zero `errcode`.
    #[error("gettoken rejected ({code}): {message}")]
    Remote { code: i64, message: String },

    /// `message/send` answered with a non-zero `errcode`.
    #[error("{}", send_rejection(.code, .message, .invalid_user, .invalid_party, .invalid_tag))]
    Send {
        code: i64,
        message: String,
        invalid_user: String,
        invalid_party: String,
        invalid_tag: String,
    },
}

impl WecomError {
    /// Remote error code, when the platform answered at all.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Remote { code, .. } | Self::Send { code, .. } => Some(*code),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for WecomError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.without_url())
    }
}

fn send_rejection(
    code: &i64,
    message: &str,
    invalid_user: &str,
    invalid_party: &str,
    invalid_tag: &str,
) -> String {
    let mut out = format!("send rejected ({code}): {message}");
    let lists = [
        ("invaliduser", invalid_user),
        ("invalidparty", invalid_party),
        ("invalidtag", invalid_tag),
    ];
    for (label, list) in lists {
        if !list.is_empty() {
            out.push_str(&format!("; {label}={list}"));
        }
    }
    out
}

pub type Result<T> = std::result::Result<T, WecomError>;
