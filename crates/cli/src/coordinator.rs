// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request coordination: bearer attachment, proactive and
//! reactive token renewal, single-flight refresh.
//!
//! At most one refresh call is in flight per process. The first request that
//! needs one creates it; every request arriving while it runs attaches to
//! the same future and resumes with the renewed token. Without this, N
//! concurrent requests hitting an expired token would each fire a refresh,
//! racing the backend and invalidating each other's new tokens.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{self, RefreshError};
use crate::error::SessionError;
use crate::session::SessionManager;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// Explicit logout requested through the API.
    UserRequested,
    /// Token renewal failed: the refresh token was rejected, or the backend
    /// stayed unreachable through all retries.
    RefreshFailed,
    /// The stored fingerprint does not match this device.
    DeviceMismatch,
}

/// Events broadcast to the embedding UI layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new token pair was obtained and persisted.
    Refreshed,
    /// The session ended; listeners should route to the login screen.
    LoggedOut { reason: LogoutReason },
}

type RefreshOutcome = Result<String, SessionError>;
type InflightRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Per-process request coordinator.
///
/// The in-flight slot is checked and set under a single lock acquisition,
/// so two requests arriving in the same tick cannot both observe "idle" and
/// both start a refresh.
pub struct Coordinator {
    session: Arc<SessionManager>,
    http: reqwest::Client,
    base_url: String,
    inflight: Mutex<Option<InflightRefresh>>,
    /// Bumped on every logout; a refresh that finishes against a stale
    /// epoch discards its result instead of resurrecting the session.
    epoch: AtomicU64,
    event_tx: broadcast::Sender<SessionEvent>,
    shutdown: CancellationToken,
    refresh_retries: u32,
}

impl Coordinator {
    /// Create a coordinator. Returns the receiving end of the session event
    /// channel alongside it.
    pub fn new(
        session: Arc<SessionManager>,
        base_url: impl Into<String>,
        http: reqwest::Client,
    ) -> (Arc<Self>, broadcast::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = broadcast::channel(16);
        let coordinator = Arc::new(Self {
            session,
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            inflight: Mutex::new(None),
            epoch: AtomicU64::new(0),
            event_tx,
            shutdown: CancellationToken::new(),
            refresh_retries: 2,
        });
        (coordinator, event_rx)
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Cancel outstanding work. An in-flight refresh and every request
    /// queued behind it resolve with a terminal error.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Log in with backend credentials and persist the resulting pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        let fingerprint = self.session.device_fingerprint();
        let request = backend::LoginRequest { email, password, device_fingerprint: &fingerprint };
        let pair = backend::login(&self.http, &self.base_url, &request)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        self.session.save_tokens(&pair.access_token, &pair.refresh_token)?;
        info!("login succeeded, session established");
        Ok(())
    }

    /// Explicit logout: clear credentials and notify listeners.
    pub async fn logout(&self) {
        self.end_session(LogoutReason::UserRequested).await;
    }

    /// Execute an authenticated request against the backend.
    ///
    /// Attaches the current bearer token, renewing it first when it is
    /// inside the refresh threshold. A 401 response triggers one renewal
    /// and one replay; a request still rejected after that surfaces
    /// [`SessionError::Unauthorized`] rather than retrying again, bounding
    /// worst-case latency.
    pub async fn execute(
        self: &Arc<Self>,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, SessionError> {
        let token = self.bearer_token().await?;
        let resp = self.send(method.clone(), path, body, &token).await?;
        if resp.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        // Reactive path: the proactive check passed but the backend still
        // rejected the token (clock skew, server-side revocation). Treated
        // identically to the proactive trigger, replayed exactly once.
        debug!(path, "request rejected as unauthorized, renewing token for replay");
        let token = self.renew_access_token(Some(&token)).await?;
        let resp = self.send(method, path, body, &token).await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SessionError::Unauthorized);
        }
        Ok(resp)
    }

    /// `GET` convenience wrapper over [`Coordinator::execute`].
    pub async fn get(self: &Arc<Self>, path: &str) -> Result<reqwest::Response, SessionError> {
        self.execute(reqwest::Method::GET, path, None).await
    }

    /// `POST` convenience wrapper over [`Coordinator::execute`].
    pub async fn post_json(
        self: &Arc<Self>,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, SessionError> {
        self.execute(reqwest::Method::POST, path, Some(body)).await
    }

    /// Resolve the bearer token for an outbound request: device binding
    /// first, then proactive renewal when the stored token is inside the
    /// refresh threshold.
    pub async fn bearer_token(self: &Arc<Self>) -> Result<String, SessionError> {
        if !self.session.validate_device_binding() {
            warn!("device fingerprint mismatch, forcing logout");
            self.end_session(LogoutReason::DeviceMismatch).await;
            return Err(SessionError::DeviceMismatch);
        }
        if self.session.should_refresh_access_token() {
            let stale = self.session.get_access_token();
            return self.renew_access_token(stale.as_deref()).await;
        }
        self.session.get_access_token().ok_or(SessionError::SessionExpired)
    }

    /// Renew the access token unconditionally, joining the in-flight
    /// refresh if one exists.
    pub async fn refresh_access_token(self: &Arc<Self>) -> RefreshOutcome {
        self.renew_access_token(None).await
    }

    /// Renew the access token, joining the in-flight refresh if one exists.
    ///
    /// `stale` is the token the caller decided must be replaced. When a
    /// concurrent refresh already replaced it between that decision and
    /// this lock, its result is reused instead of firing a second backend
    /// call. The check runs under the slot lock with no suspension point,
    /// so the decision is atomic.
    async fn renew_access_token(self: &Arc<Self>, stale: Option<&str>) -> RefreshOutcome {
        let fut = {
            let mut slot = self.inflight.lock().await;
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    if let (Some(stale), Some(current)) = (stale, self.session.get_access_token())
                    {
                        if current != stale {
                            return Ok(current);
                        }
                    }
                    let created = self.spawn_refresh();
                    *slot = Some(created.clone());
                    created
                }
            }
        };
        fut.await
    }

    /// Spawn the refresh as a task so it runs to completion even when every
    /// awaiter is cancelled, and clears the in-flight slot when done.
    fn spawn_refresh(self: &Arc<Self>) -> InflightRefresh {
        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = coordinator.do_refresh().await;
            *coordinator.inflight.lock().await = None;
            result
        });
        async move {
            match handle.await {
                Ok(result) => result,
                Err(_) => Err(SessionError::RefreshFailed("refresh task aborted".to_owned())),
            }
        }
        .boxed()
        .shared()
    }

    async fn do_refresh(self: &Arc<Self>) -> RefreshOutcome {
        let epoch = self.epoch.load(Ordering::Acquire);

        let Some(refresh_token) = self.session.get_refresh_token() else {
            self.end_session(LogoutReason::RefreshFailed).await;
            return Err(SessionError::SessionExpired);
        };

        let refreshed = tokio::select! {
            r = backend::refresh_with_retries(
                &self.http,
                &self.base_url,
                &refresh_token,
                self.refresh_retries,
            ) => r,
            _ = self.shutdown.cancelled() => return Err(SessionError::SessionExpired),
        };

        match refreshed {
            Ok(pair) => {
                // A logout that happened while the call was in flight wins:
                // discard the new pair rather than resurrect the session.
                if self.epoch.load(Ordering::Acquire) != epoch {
                    debug!("refresh completed after logout, discarding token pair");
                    return Err(SessionError::SessionExpired);
                }
                if let Err(e) = self.session.save_tokens(&pair.access_token, &pair.refresh_token) {
                    warn!(err = %e, "backend returned an unusable token pair");
                    self.end_session(LogoutReason::RefreshFailed).await;
                    return Err(SessionError::RefreshFailed(e.to_string()));
                }
                info!("access token renewed");
                let _ = self.event_tx.send(SessionEvent::Refreshed);
                Ok(pair.access_token)
            }
            Err(RefreshError::Denied(msg)) => {
                warn!(err = %msg, "refresh token rejected by backend");
                self.end_session(LogoutReason::RefreshFailed).await;
                Err(SessionError::SessionExpired)
            }
            Err(RefreshError::Transient(msg)) => {
                warn!(err = %msg, "refresh failed after retries");
                self.end_session(LogoutReason::RefreshFailed).await;
                Err(SessionError::RefreshFailed(msg))
            }
        }
    }

    async fn end_session(&self, reason: LogoutReason) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Err(e) = self.session.clear_tokens() {
            warn!(err = %e, "failed to clear credentials during logout");
        }
        info!(?reason, "session ended");
        let _ = self.event_tx.send(SessionEvent::LoggedOut { reason });
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<reqwest::Response, SessionError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| SessionError::Transport(format!("request failed: {e}")))
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
