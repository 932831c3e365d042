// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Recruitment-platform session client configuration.
#[derive(Debug, Parser)]
pub struct Config {
    /// Base URL of the recruitment API.
    #[arg(long, env = "LOCUM_API_URL")]
    pub api_url: String,

    /// Directory for persisted credentials (defaults to the platform state dir).
    #[arg(long, env = "LOCUM_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "LOCUM_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOCUM_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    // -- Duration overrides (skip from CLI; set in Config::test()) --------
    /// HTTP timeout in ms for all backend calls, refresh included.
    #[clap(skip)]
    pub http_timeout_ms: Option<u64>,
    /// Time-to-expiry in ms below which the access token is renewed.
    #[clap(skip)]
    pub refresh_threshold_ms: Option<u64>,
}

fn env_duration_ms(var: &str, default: u64) -> Duration {
    let ms = std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default);
    Duration::from_millis(ms)
}

macro_rules! duration_field {
    ($method:ident, $field:ident, $env:literal, $default:expr) => {
        pub fn $method(&self) -> Duration {
            match self.$field {
                Some(ms) => Duration::from_millis(ms),
                None => env_duration_ms($env, $default),
            }
        }
    };
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("--api-url must be an http(s) URL");
        }

        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }

        Ok(())
    }

    // -- Tuning knobs (field override → env var → compiled default) --------

    duration_field!(http_timeout, http_timeout_ms, "LOCUM_HTTP_TIMEOUT_MS", 30_000);
    duration_field!(refresh_threshold, refresh_threshold_ms, "LOCUM_REFRESH_THRESHOLD_MS", 300_000);

    /// Resolve the directory for persisted credentials.
    ///
    /// Checks the explicit override (flag or `LOCUM_STATE_DIR`), then
    /// `$XDG_STATE_HOME/locum`, then `$HOME/.local/state/locum`.
    pub fn resolved_state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("locum");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/locum");
        }
        PathBuf::from(".locum")
    }

    /// Build a minimal `Config` for tests (loopback API, tight timeouts).
    #[doc(hidden)]
    pub fn test() -> Self {
        Self {
            api_url: "http://127.0.0.1:1".into(),
            state_dir: None,
            log_format: "text".into(),
            log_level: "debug".into(),
            http_timeout_ms: Some(2_000),
            refresh_threshold_ms: Some(300_000),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
