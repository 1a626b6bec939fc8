// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WeCom (Qiye Wechat) API access: token lifecycle and message sending.

pub mod client;
pub mod error;
pub mod message;
pub mod refresh;
pub mod token;

/// Default API root when the configuration leaves `base_url` unset.
pub const DEFAULT_BASE_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin";

/// Install ring as the process-wide rustls provider (reqwest is built
/// without one). Safe to call repeatedly.
pub fn install_crypto_provider() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
