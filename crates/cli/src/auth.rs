// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI session management — the `locum` subcommands.
//!
//! The thin UI collaborator over the session core: it builds the lifecycle
//! manager and coordinator from config, runs one operation, and renders the
//! outcome. Forced logouts surface here as a "session expired" notice.

use std::sync::Arc;

use clap::Subcommand;

use crate::backend;
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::session::SessionManager;
use crate::store::FileStore;
use crate::token;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Log in and persist a session for this device
    Login {
        /// Account email
        #[arg(long, env = "LOCUM_EMAIL")]
        email: String,
        /// Account password
        #[arg(long, env = "LOCUM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the current session status
    Status,
    /// Renew the access token now
    Refresh,
    /// End the session and clear stored credentials
    Logout,
}

pub async fn run(config: &Config, command: AuthCommand) -> i32 {
    let session = Arc::new(
        SessionManager::new(Box::new(FileStore::new(config.resolved_state_dir())))
            .with_refresh_threshold(config.refresh_threshold().as_millis() as u64),
    );
    let http = backend::http_client(config.http_timeout());
    let (coordinator, _events) =
        Coordinator::new(Arc::clone(&session), config.api_url.clone(), http);

    match command {
        AuthCommand::Login { email, password } => {
            match coordinator.login(&email, &password).await {
                Ok(()) => {
                    println!("Logged in. Session is active on this device.");
                    0
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }

        AuthCommand::Status => {
            print_status(&session);
            0
        }

        AuthCommand::Refresh => match coordinator.refresh_access_token().await {
            Ok(_) => {
                println!("Access token renewed.");
                print_status(&session);
                0
            }
            Err(e) if e.is_terminal() => {
                eprintln!("Session expired — please log in again.");
                1
            }
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        },

        AuthCommand::Logout => {
            coordinator.logout().await;
            println!("Logged out.");
            0
        }
    }
}

fn print_status(session: &SessionManager) {
    let now = token::epoch_ms();
    println!("{:<10} {}", "STATUS", session.state());

    if let Some(access) = session.get_access_token() {
        println!("{:<10} {}", "ACCESS", format_expiry(token::ms_until_expiry(&access, now)));
    }
    if let Some(refresh) = session.get_refresh_token() {
        println!("{:<10} {}", "REFRESH", format_expiry(token::ms_until_expiry(&refresh, now)));
    }
    let binding = if session.validate_device_binding() { "bound" } else { "mismatch" };
    println!("{:<10} {binding}", "DEVICE");
}

fn format_expiry(ms: Option<i64>) -> String {
    match ms {
        None => "\u{2014}".to_string(),
        Some(ms) if ms <= 0 => "expired".to_string(),
        Some(ms) => {
            let total = (ms / 1000) as u64;
            let m = total / 60;
            let s = total % 60;
            if m >= 60 {
                format!("{}h {:02}m", m / 60, m % 60)
            } else {
                format!("{m}m {s:02}s")
            }
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
