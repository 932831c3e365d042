// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token lifecycle: persistence, validation, and renewal-threshold queries.
//!
//! All session state is derived live from the credential store; nothing is
//! cached between calls. A torn multi-key write is therefore observed on the
//! next read and treated as "no valid session" rather than masked.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::device;
use crate::error::SessionError;
use crate::store::{
    CredentialStore, KEY_ACCESS_TOKEN, KEY_DEVICE_FINGERPRINT, KEY_REFRESH_TOKEN,
};
use crate::token;

/// Time-to-expiry below which the access token is proactively renewed.
///
/// The goal is that a user in an active session never observes a hard 401
/// from an access-token expiry — renewal happens silently while margin
/// remains.
pub const REFRESH_THRESHOLD_MS: u64 = 5 * 60 * 1000;

/// An access + refresh token pair. Always replaced as a unit, never
/// partially updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Conceptual session state, derived live from storage on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable token pair is stored.
    NoSession,
    /// Both tokens present, access token still fresh.
    ValidSession,
    /// Access token expired but the refresh token can still renew it.
    ExpiredAccessValidRefresh,
    /// The refresh token itself has expired; only a new login helps.
    ExpiredRefresh,
    /// The stored pair was obtained on a different device.
    DeviceMismatch,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSession => f.write_str("no session"),
            Self::ValidSession => f.write_str("active"),
            Self::ExpiredAccessValidRefresh => f.write_str("renewable"),
            Self::ExpiredRefresh => f.write_str("expired"),
            Self::DeviceMismatch => f.write_str("device mismatch"),
        }
    }
}

type FingerprintProvider = Arc<dyn Fn() -> String + Send + Sync>;
type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Owns the stored token pair and answers freshness and binding queries.
///
/// Instantiated per process with its own store, clock, and fingerprint
/// provider so tests can run isolated instances side by side.
pub struct SessionManager {
    store: Box<dyn CredentialStore>,
    fingerprint: FingerprintProvider,
    now_ms: Clock,
    refresh_threshold_ms: u64,
}

impl SessionManager {
    pub fn new(store: Box<dyn CredentialStore>) -> Self {
        Self {
            store,
            fingerprint: Arc::new(|| device::cached_fingerprint().to_owned()),
            now_ms: Arc::new(token::epoch_ms),
            refresh_threshold_ms: REFRESH_THRESHOLD_MS,
        }
    }

    /// Replace the fingerprint provider (device-swap simulation in tests).
    pub fn with_fingerprint_provider(
        mut self,
        provider: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.fingerprint = Arc::new(provider);
        self
    }

    /// Replace the wall clock. Tests fast-forward time through this.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.now_ms = Arc::new(clock);
        self
    }

    /// Override the proactive-renewal threshold.
    pub fn with_refresh_threshold(mut self, threshold_ms: u64) -> Self {
        self.refresh_threshold_ms = threshold_ms;
        self
    }

    /// The fingerprint of this device, freshly derived.
    pub fn device_fingerprint(&self) -> String {
        (self.fingerprint)()
    }

    /// Validate and persist a token pair, stamping the current device
    /// fingerprint alongside it.
    ///
    /// Both tokens must decode as JWTs ([`SessionError::InvalidTokenPair`])
    /// and the refresh token must not already be expired
    /// ([`SessionError::RefreshTokenExpired`]); nothing can renew an
    /// expired refresh token. An expired *access* token is accepted:
    /// renewal replaces it on next use. The store is not touched unless
    /// validation passes.
    pub fn save_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), SessionError> {
        if token::decode(access_token).is_err() || token::decode(refresh_token).is_err() {
            return Err(SessionError::InvalidTokenPair);
        }
        if token::is_expired(refresh_token, (self.now_ms)()) {
            return Err(SessionError::RefreshTokenExpired);
        }

        // Three sequential per-key writes; no rollback on partial failure.
        // Readers re-validate, so a torn triad reads as "no session".
        self.store.put(KEY_ACCESS_TOKEN, access_token)?;
        self.store.put(KEY_REFRESH_TOKEN, refresh_token)?;
        self.store.put(KEY_DEVICE_FINGERPRINT, &(self.fingerprint)())?;

        debug!("token pair saved");
        Ok(())
    }

    /// Stored access token, or `None` when absent or unreadable.
    pub fn get_access_token(&self) -> Option<String> {
        self.read(KEY_ACCESS_TOKEN)
    }

    /// Stored refresh token, or `None` when absent or unreadable.
    pub fn get_refresh_token(&self) -> Option<String> {
        self.read(KEY_REFRESH_TOKEN)
    }

    /// Both stored tokens. Each side is independently `None` when absent.
    pub fn get_tokens(&self) -> (Option<String>, Option<String>) {
        (self.get_access_token(), self.get_refresh_token())
    }

    /// Delete all three keys. Safe to call repeatedly on an empty store.
    pub fn clear_tokens(&self) -> Result<(), SessionError> {
        self.store.delete(KEY_ACCESS_TOKEN)?;
        self.store.delete(KEY_REFRESH_TOKEN)?;
        self.store.delete(KEY_DEVICE_FINGERPRINT)?;
        Ok(())
    }

    /// `true` when no access token is stored or the stored one is expired.
    pub fn is_access_token_expired(&self) -> bool {
        match self.get_access_token() {
            Some(tok) => token::is_expired(&tok, (self.now_ms)()),
            None => true,
        }
    }

    /// Proactive-renewal trigger: `true` when no access token is stored or
    /// its time-to-expiry has dropped below the refresh threshold
    /// (strictly-less-than at the boundary).
    pub fn should_refresh_access_token(&self) -> bool {
        let Some(tok) = self.get_access_token() else {
            return true;
        };
        match token::ms_until_expiry(&tok, (self.now_ms)()) {
            Some(remaining) => remaining < self.refresh_threshold_ms as i64,
            None => true,
        }
    }

    /// `true` when no fingerprint was ever stored (sessions predating
    /// binding) or the stored fingerprint matches this device.
    ///
    /// Fail-open on "no data", fail-closed on mismatch: a mismatch means
    /// the tokens were copied from another install and the session must not
    /// be trusted.
    pub fn validate_device_binding(&self) -> bool {
        match self.read(KEY_DEVICE_FINGERPRINT) {
            None => true,
            Some(stored) => device::constant_time_eq(&stored, &(self.fingerprint)()),
        }
    }

    /// Shape check: both tokens present and structurally valid JWTs.
    ///
    /// Expiry is deliberately not checked here — freshness is the
    /// coordinator's concern. This guards the read path against torn or
    /// corrupt storage.
    pub fn validate_tokens(&self) -> bool {
        match self.get_tokens() {
            (Some(access), Some(refresh)) => {
                token::decode(&access).is_ok() && token::decode(&refresh).is_ok()
            }
            _ => false,
        }
    }

    /// Whether a usable session exists: the pair is well-formed and at
    /// least one path forward remains (a fresh access token, or an
    /// unexpired refresh token to renew with).
    pub fn is_logged_in(&self) -> bool {
        self.state() == SessionState::ValidSession
            || self.state() == SessionState::ExpiredAccessValidRefresh
    }

    /// Derive the current session state from the stored pair and binding.
    pub fn state(&self) -> SessionState {
        if !self.validate_tokens() {
            return SessionState::NoSession;
        }
        if !self.validate_device_binding() {
            return SessionState::DeviceMismatch;
        }
        let now = (self.now_ms)();
        let refresh_expired = self
            .get_refresh_token()
            .map(|t| token::is_expired(&t, now))
            .unwrap_or(true);
        if refresh_expired {
            return SessionState::ExpiredRefresh;
        }
        if self.is_access_token_expired() {
            return SessionState::ExpiredAccessValidRefresh;
        }
        SessionState::ValidSession
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, err = %e, "credential read failed, treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
