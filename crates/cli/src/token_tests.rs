// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{forge_jwt, forge_jwt_expiring_in};

#[test]
fn decode_extracts_claims() -> anyhow::Result<()> {
    let token = forge_jwt(1_900_000_000, 1_899_990_000, "doctor-42");
    let claims = decode(&token)?;
    assert_eq!(claims.exp, 1_900_000_000);
    assert_eq!(claims.iat, 1_899_990_000);
    assert_eq!(claims.sub.as_deref(), Some("doctor-42"));
    Ok(())
}

#[yare::parameterized(
    empty = { "" },
    one_segment = { "abc" },
    two_segments = { "abc.def" },
    four_segments = { "a.b.c.d" },
    invalid_base64 = { "head.!!!not-base64!!!.sig" },
    payload_not_json = { "head.bm90LWpzb24.sig" },
)]
fn decode_rejects_malformed(token: &str) {
    assert!(matches!(decode(token), Err(SessionError::Malformed)));
}

#[test]
fn decode_rejects_missing_exp() {
    // Structurally fine but the payload carries no `exp` claim.
    let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"doctor-42"}"#);
    let token = format!("head.{payload}.sig");
    assert!(decode(&token).is_err());
}

#[test]
fn is_expired_boundary() {
    let token = forge_jwt(1_000, 0, "u");
    // exp * 1000 <= now means expired exactly at the boundary.
    assert!(!is_expired(&token, 999_999));
    assert!(is_expired(&token, 1_000_000));
    assert!(is_expired(&token, 1_000_001));
}

#[test]
fn is_expired_fails_closed_on_garbage() {
    assert!(is_expired("definitely-not-a-jwt", 0));
    assert!(is_expired("", u64::MAX));
}

#[test]
fn ms_until_expiry_may_be_negative() {
    let token = forge_jwt(1_000, 0, "u");
    assert_eq!(ms_until_expiry(&token, 400_000), Some(600_000));
    assert_eq!(ms_until_expiry(&token, 1_600_000), Some(-600_000));
    assert_eq!(ms_until_expiry("garbage", 0), None);
}

#[test]
fn forged_future_token_is_not_expired_now() {
    let token = forge_jwt_expiring_in(3_600);
    assert!(!is_expired(&token, epoch_ms()));
}

proptest::proptest! {
    #[test]
    fn decode_never_panics(s in "\\PC*") {
        let _ = decode(&s);
    }

    #[test]
    fn truncated_valid_token_never_decodes_as_valid(cut in 1usize..20) {
        let token = forge_jwt(1_900_000_000, 0, "u");
        let truncated = &token[..token.len().saturating_sub(cut)];
        // Either malformed or still decodable (cutting into the signature
        // only); it must never panic and never misreport expiry claims.
        if let Ok(claims) = decode(truncated) {
            proptest::prop_assert_eq!(claims.exp, 1_900_000_000);
        }
    }
}
