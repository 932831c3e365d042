// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend auth endpoints: login and token refresh over HTTP.
//!
//! The backend owns credential verification and token signing; this module
//! owns only the wire calls and their error classification. A refresh
//! failure is either a denial (the refresh token is invalid, expired, or
//! revoked — never retried) or transient (retried with backoff).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::TokenPair;

/// Wire envelope for a token pair returned by login and refresh.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
}

/// Error body returned by the auth endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Login payload. The device fingerprint rides along so the backend can
/// bind the issued pair to this install.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub device_fingerprint: &'a str,
}

/// Outcome classification for a refresh attempt.
#[derive(Debug, Clone)]
pub enum RefreshError {
    /// Permanent failure — the refresh token is invalid, expired, or revoked.
    Denied(String),
    /// Temporary failure — network error or backend hiccup, retryable.
    Transient(String),
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied(msg) => write!(f, "denied: {msg}"),
            Self::Transient(msg) => write!(f, "transient: {msg}"),
        }
    }
}

/// Build the HTTP client used for API calls: bounded timeout, rustls.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    // reqwest is built with `rustls-no-provider`; install the ring crypto
    // provider once before constructing a client. Idempotent — subsequent
    // calls return Err because a provider is already set, which we ignore.
    let _ = rustls::crypto::ring::default_provider().install_default();
    reqwest::Client::builder().timeout(timeout).build().unwrap_or_default()
}

/// Perform a single token refresh request.
pub async fn do_refresh(
    client: &reqwest::Client,
    base_url: &str,
    refresh_token: &str,
) -> Result<TokenPair, RefreshError> {
    let url = format!("{}/auth/refresh", base_url.trim_end_matches('/'));
    let resp = client
        .post(&url)
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .map_err(|e| RefreshError::Transient(format!("HTTP error: {e}")))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| RefreshError::Transient(format!("read body: {e}")))?;

    if !status.is_success() {
        if let Ok(err) = serde_json::from_str::<AuthErrorResponse>(&body) {
            if is_denial(status, &err.error) {
                return Err(RefreshError::Denied(err.error_description.unwrap_or(err.error)));
            }
            return Err(RefreshError::Transient(format!(
                "{}: {}",
                err.error,
                err.error_description.unwrap_or_default()
            )));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RefreshError::Denied(format!("HTTP {status}")));
        }
        return Err(RefreshError::Transient(format!("HTTP {status}: {body}")));
    }

    let pair: TokenPairResponse = serde_json::from_str(&body)
        .map_err(|e| RefreshError::Transient(format!("parse response: {e}")))?;
    Ok(TokenPair { access_token: pair.access_token, refresh_token: pair.refresh_token })
}

/// Whether an error response means the refresh token itself is dead.
fn is_denial(status: reqwest::StatusCode, code: &str) -> bool {
    status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || matches!(code, "invalid_grant" | "invalid_token" | "token_expired" | "device_mismatch")
}

/// Refresh with exponential backoff retries. Denials are never retried.
pub async fn refresh_with_retries(
    client: &reqwest::Client,
    base_url: &str,
    refresh_token: &str,
    max_retries: u32,
) -> Result<TokenPair, RefreshError> {
    let mut backoff = Duration::from_millis(500);
    let max_backoff = Duration::from_secs(8);

    for attempt in 0..=max_retries {
        match do_refresh(client, base_url, refresh_token).await {
            Ok(pair) => return Ok(pair),
            Err(RefreshError::Denied(msg)) => return Err(RefreshError::Denied(msg)),
            Err(RefreshError::Transient(msg)) => {
                if attempt == max_retries {
                    return Err(RefreshError::Transient(msg));
                }
                tracing::debug!(attempt, err = %msg, "refresh attempt failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    Err(RefreshError::Transient("refresh exhausted all retries".to_owned()))
}

/// Exchange login credentials for an initial token pair.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    request: &LoginRequest<'_>,
) -> anyhow::Result<TokenPair> {
    let url = format!("{}/auth/login", base_url.trim_end_matches('/'));
    let resp = client.post(&url).json(request).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if let Ok(err) = serde_json::from_str::<AuthErrorResponse>(&text) {
            anyhow::bail!(
                "login failed ({status}): {} {}",
                err.error,
                err.error_description.unwrap_or_default()
            );
        }
        anyhow::bail!("login failed ({status}): {text}");
    }

    let pair: TokenPairResponse = resp.json().await?;
    Ok(TokenPair { access_token: pair.access_token, refresh_token: pair.refresh_token })
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
