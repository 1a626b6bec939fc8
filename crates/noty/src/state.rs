// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::agent::AgentRegistry;
use crate::transport::verify::Verifier;

/// Shared relay state handed to every HTTP handler.
pub struct RelayState {
    pub registry: AgentRegistry,
    pub verifier: Arc<dyn Verifier>,
    /// Bearer token for text-sender endpoints. If unset, auth is disabled.
    pub auth_token: Option<String>,
}

impl RelayState {
    pub fn new(
        registry: AgentRegistry,
        verifier: Arc<dyn Verifier>,
        auth_token: Option<String>,
    ) -> Self {
        Self { registry, verifier, auth_token }
    }
}
