// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;

use super::*;
use crate::test_support::forge_jwt_expiring_in;

#[yare::parameterized(
    undecodable = { None, "\u{2014}" },
    already_expired = { Some(-5_000), "expired" },
    zero = { Some(0), "expired" },
    seconds = { Some(95_000), "1m 35s" },
    minutes = { Some(52 * 60 * 1000 + 11_000), "52m 11s" },
    hours = { Some((3 * 60 + 7) * 60 * 1000), "3h 07m" },
)]
fn format_expiry_cases(ms: Option<i64>, expected: &str) {
    assert_eq!(format_expiry(ms), expected);
}

#[tokio::test]
async fn status_on_empty_store_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::test();
    config.state_dir = Some(dir.path().to_path_buf());

    let code = run(&config, AuthCommand::Status).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn logout_on_empty_store_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::test();
    config.state_dir = Some(dir.path().to_path_buf());

    let code = run(&config, AuthCommand::Logout).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn login_persists_session_across_invocations() -> anyhow::Result<()> {
    let access = forge_jwt_expiring_in(3600);
    let refresh = forge_jwt_expiring_in(7200);
    let body =
        serde_json::json!({ "accessToken": access, "refreshToken": refresh }).to_string();

    let app = Router::new().route(
        "/auth/login",
        post(move |_body: String| {
            let body = body.clone();
            async move { (axum::http::StatusCode::OK, body) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let dir = tempfile::tempdir()?;
    let mut config = Config::test();
    config.api_url = format!("http://{addr}");
    config.state_dir = Some(dir.path().to_path_buf());

    let code = run(&config, AuthCommand::Login {
        email: "doc@hospital.example".into(),
        password: "hunter2".into(),
    })
    .await;
    assert_eq!(code, 0);

    // A fresh manager over the same state dir sees the session — the pair
    // survived the process boundary.
    let session = SessionManager::new(Box::new(FileStore::new(dir.path())));
    assert!(session.is_logged_in());
    assert_eq!(session.get_tokens(), (Some(access), Some(refresh)));

    // And an explicit logout clears it.
    let code = run(&config, AuthCommand::Logout).await;
    assert_eq!(code, 0);
    assert!(!session.is_logged_in());
    Ok(())
}

#[tokio::test]
async fn login_failure_returns_nonzero() {
    let app = Router::new().route(
        "/auth/login",
        post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "{\"error\":\"invalid_credentials\"}") }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::test();
    config.api_url = format!("http://{addr}");
    config.state_dir = Some(dir.path().to_path_buf());

    let code = run(&config, AuthCommand::Login {
        email: "doc@hospital.example".into(),
        password: "wrong".into(),
    })
    .await;
    assert_eq!(code, 1);
}
