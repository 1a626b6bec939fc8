// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::{HeaderMap, HeaderValue};

use super::{constant_time_eq, validate_bearer};
use crate::error::RelayError;

fn headers(auth: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(auth) {
        map.insert("authorization", value);
    }
    map
}

#[test]
fn no_expected_token_allows_all() {
    assert_eq!(validate_bearer(&HeaderMap::new(), None), Ok(()));
}

#[yare::parameterized(
    valid        = { "Bearer s3cret", Ok(()) },
    wrong        = { "Bearer nope", Err(RelayError::Unauthorized) },
    wrong_scheme = { "Basic s3cret", Err(RelayError::Unauthorized) },
    empty        = { "", Err(RelayError::Unauthorized) },
)]
fn bearer_validation(header: &str, expected: Result<(), RelayError>) {
    assert_eq!(validate_bearer(&headers(header), Some("s3cret")), expected);
}

#[test]
fn constant_time_eq_compares_length_and_bytes() {
    assert!(constant_time_eq("abc", "abc"));
    assert!(!constant_time_eq("abc", "abd"));
    assert!(!constant_time_eq("abc", "abcd"));
}
