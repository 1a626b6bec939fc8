// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payloads for `message/send`.

use serde::{Deserialize, Serialize, Serializer};

/// Recipient used when a send names no user, party, or tag.
pub const ALL_USERS: &str = "@all";

/// Outbound message body.
///
/// Recipient lists are `|`-separated, as the platform expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub touser: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub toparty: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub totag: String,
    pub msgtype: String,
    #[serde(serialize_with = "serialize_agent_id")]
    pub agentid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(skip_serializing_if = "is_zero")]
    pub safe: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub enable_duplicate_check: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_check_interval: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

impl Message {
    /// A text message from `agent_id`, addressed to everyone until a
    /// recipient setter narrows it.
    pub fn text(agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            touser: ALL_USERS.to_owned(),
            toparty: String::new(),
            totag: String::new(),
            msgtype: "text".to_owned(),
            agentid: agent_id.into(),
            text: Some(TextContent { content: content.into() }),
            safe: 0,
            enable_duplicate_check: 0,
            duplicate_check_interval: None,
        }
    }

    /// Set explicit recipients. Empty lists are left out; when all three are
    /// empty the message stays addressed to [`ALL_USERS`].
    pub fn to(mut self, users: &str, parties: &str, tags: &str) -> Self {
        if users.is_empty() && parties.is_empty() && tags.is_empty() {
            return self;
        }
        self.touser = users.to_owned();
        self.toparty = parties.to_owned();
        self.totag = tags.to_owned();
        self
    }

    pub fn confidential(mut self, safe: bool) -> Self {
        self.safe = u8::from(safe);
        self
    }

    /// Ask the platform to drop identical messages within `interval_secs`.
    pub fn dedup_within(mut self, interval_secs: u32) -> Self {
        self.enable_duplicate_check = 1;
        self.duplicate_check_interval = Some(interval_secs);
        self
    }
}

/// Agent ids are opaque strings here but the platform expects an integer
/// `agentid`; numeric ids go out as numbers, anything else verbatim.
fn serialize_agent_id<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match id.parse::<i64>() {
        Ok(n) => serializer.serialize_i64(n),
        Err(_) => serializer.serialize_str(id),
    }
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

/// Response of `message/send`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(default)]
    pub invaliduser: String,
    #[serde(default)]
    pub invalidparty: String,
    #[serde(default)]
    pub invalidtag: String,
    #[serde(default)]
    pub msgid: String,
    #[serde(default)]
    pub response_code: String,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
