// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JWT payload decoding without signature verification.
//!
//! The client never holds signing keys — verifying signatures is the
//! backend's job. This codec only extracts the timing claims the lifecycle
//! layer needs. Any structural failure yields [`SessionError::Malformed`];
//! an undecodable token is always treated as expired (fail closed).

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::error::SessionError;

/// Claims extracted from a JWT payload.
///
/// Derived on every query from the raw token string, never stored.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
    /// Issued-at, seconds since the Unix epoch.
    #[serde(default)]
    pub iat: u64,
    /// Subject (user identifier).
    #[serde(default)]
    pub sub: Option<String>,
}

/// Decode the payload segment of a JWT.
///
/// The middle segment is parsed as base64url JSON; the signature segment is
/// carried but never checked. Wrong segment count, invalid base64, invalid
/// JSON, or a payload missing `exp` all yield [`SessionError::Malformed`].
pub fn decode(token: &str) -> Result<Claims, SessionError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(SessionError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| SessionError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| SessionError::Malformed)
}

/// `true` when the token cannot be decoded or its expiry is at or before
/// `now_ms`.
pub fn is_expired(token: &str, now_ms: u64) -> bool {
    match decode(token) {
        Ok(claims) => claims.exp.saturating_mul(1000) <= now_ms,
        Err(_) => true,
    }
}

/// Milliseconds until the token expires (negative once past expiry).
/// `None` only when the token is undecodable.
pub fn ms_until_expiry(token: &str, now_ms: u64) -> Option<i64> {
    let claims = decode(token).ok()?;
    Some(claims.exp.saturating_mul(1000) as i64 - now_ms as i64)
}

/// Wall-clock time in milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
