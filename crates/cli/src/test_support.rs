// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: token forging and assertion helpers.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Forge an unsigned JWT with the given expiry and issued-at (epoch
/// seconds). The signature segment is a placeholder; the client never
/// verifies signatures.
pub fn forge_jwt(exp_secs: u64, iat_secs: u64, sub: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "exp": exp_secs, "iat": iat_secs, "sub": sub }).to_string(),
    );
    format!("{header}.{payload}.forged-signature")
}

/// Forge a JWT expiring `offset_secs` from the real wall clock (negative
/// for already-expired tokens).
pub fn forge_jwt_expiring_in(offset_secs: i64) -> String {
    let now = crate::token::epoch_ms() / 1000;
    forge_jwt(now.saturating_add_signed(offset_secs), now, "user-1")
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
