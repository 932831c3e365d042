// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session error taxonomy shared by the token lifecycle and the request
//! coordinator.

use std::fmt;

/// Errors produced by the session lifecycle and request coordination layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A token string is not a structurally valid JWT.
    Malformed,
    /// A token pair was rejected at save time because one side does not parse.
    InvalidTokenPair,
    /// A token pair was rejected at save time because the refresh token has
    /// already expired. No recovery is possible from such a pair.
    RefreshTokenExpired,
    /// The stored device fingerprint does not match this device.
    DeviceMismatch,
    /// Token renewal failed; the session has been terminated.
    RefreshFailed(String),
    /// The session ended while this request was waiting on a refresh.
    SessionExpired,
    /// The backend rejected the request even after a post-refresh replay.
    Unauthorized,
    /// Credential storage failure.
    Storage(String),
    /// Network-level failure talking to the backend.
    Transport(String),
}

impl SessionError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED",
            Self::InvalidTokenPair => "INVALID_TOKEN_PAIR",
            Self::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            Self::DeviceMismatch => "DEVICE_MISMATCH",
            Self::RefreshFailed(_) => "REFRESH_FAILED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Storage(_) => "STORAGE",
            Self::Transport(_) => "TRANSPORT",
        }
    }

    /// Whether this error ends the session. Terminal errors are never
    /// recovered locally; they propagate to a forced logout.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DeviceMismatch | Self::RefreshFailed(_) | Self::SessionExpired
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => f.write_str("token is not a structurally valid JWT"),
            Self::InvalidTokenPair => f.write_str("token pair rejected: one side does not parse"),
            Self::RefreshTokenExpired => {
                f.write_str("token pair rejected: refresh token already expired")
            }
            Self::DeviceMismatch => f.write_str("stored tokens are bound to a different device"),
            Self::RefreshFailed(msg) => write!(f, "token renewal failed: {msg}"),
            Self::SessionExpired => f.write_str("session expired"),
            Self::Unauthorized => f.write_str("request unauthorized after token renewal"),
            Self::Storage(msg) => write!(f, "credential storage error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
