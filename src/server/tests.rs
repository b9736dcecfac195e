// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::fs;
use std::sync::Arc;

use poem::{http::StatusCode, test::TestClient};
use tempfile::TempDir;

use crate::cache::inmem::InMemCache;
use crate::config::{Config, ConfigManager};
use crate::server::{action_key, app, AppState, AJAX_PATH, PLUGINS_PATH};

const TOKEN: &str = "secret";

fn state(dropin: Option<&str>, rearm_on_end: bool) -> (Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("object-cache.php");
    if let Some(content) = dropin {
        fs::write(&path, content).unwrap();
    }

    let mut config = Config::empty();
    config.object_cache_file = path.display().to_string();
    config.admin.tokens = vec![TOKEN.to_string()];
    config.probe.rearm_on_end = rearm_on_end;
    config.plugins = vec![
        "object-cache-diagnosis/object-cache-diagnosis.php".to_string(),
        "akismet/akismet.php".to_string(),
    ];

    let state = AppState::new(
        Arc::new(ConfigManager::with_config(config)),
        Arc::new(InMemCache::new()),
    )
    .unwrap();
    (Arc::new(state), dir)
}

async fn ajax(
    cli: &TestClient<impl poem::Endpoint>,
    step: Option<&str>,
    token: Option<&str>,
) -> (StatusCode, String) {
    let mut req = cli.get(AJAX_PATH).query("action", &action_key());
    if let Some(step) = step {
        req = req.query("step", &step);
    }
    if let Some(token) = token {
        req = req.header("X-Admin-Token", token);
    }
    let resp = req.send().await;
    let status = resp.0.status();
    let body = resp.0.into_body().into_string().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn test_start_streams_report_and_next_link() {
    let (state, _dir) = state(Some("<?php $r = new Redis();"), false);
    let cli = TestClient::new(app(state));

    let (status, body) = ajax(&cli, None, Some(TOKEN)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Object cache type is: <strong>Redis</strong>."));
    assert!(body.contains(&format!(
        "href=\"http://localhost{}?action={}&step=end\"",
        AJAX_PATH,
        action_key()
    )));
}

#[tokio::test]
async fn test_start_then_end_verifies() {
    let (state, _dir) = state(Some("<?php $r = new Redis();"), false);
    let cli = TestClient::new(app(state));

    ajax(&cli, None, Some(TOKEN)).await;
    let (status, body) = ajax(&cli, Some("end"), Some(TOKEN)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Cache exists（Redis), your object cache system works fine."));
    assert!(body.contains("Done, click to close this page"));
    assert!(!body.contains("Next step"));

    let (_, body) = ajax(&cli, Some("end"), Some(TOKEN)).await;
    assert!(body.contains("Cache not found (Redis)"));
}

#[tokio::test]
async fn test_end_without_start_fails() {
    let (state, _dir) = state(Some("$c = new \\Memcached();"), false);
    let cli = TestClient::new(app(state));

    let (_, body) = ajax(&cli, Some("end"), Some(TOKEN)).await;

    assert!(body.contains("Cache not found (Memcached)"));
}

#[tokio::test]
async fn test_rearm_on_end_links_again() {
    let (state, _dir) = state(Some("<?php $r = new Redis();"), true);
    let cli = TestClient::new(app(state));

    ajax(&cli, None, Some(TOKEN)).await;
    let (_, body) = ajax(&cli, Some("end"), Some(TOKEN)).await;
    assert!(body.contains("Cache exists（Redis)"));
    assert!(body.contains("Next step"));

    let (_, body) = ajax(&cli, Some("end"), Some(TOKEN)).await;
    assert!(body.contains("Cache exists（Redis)"));
}

#[tokio::test]
async fn test_non_admin_gets_permission_line_only() {
    let (state, _dir) = state(Some("<?php $r = new Redis();"), false);
    let cli = TestClient::new(app(state));

    for step in [None, Some("end")] {
        let (_, body) = ajax(&cli, step, None).await;
        assert_eq!(body, "Insufficient permissions | 权限不足");
        let (_, body) = ajax(&cli, step, Some("wrong")).await;
        assert_eq!(body, "Insufficient permissions | 权限不足");
    }
}

#[tokio::test]
async fn test_sole_query_token_is_kept_in_next_link() {
    let (state, _dir) = state(Some("<?php $r = new Redis();"), false);
    let cli = TestClient::new(app(state));

    let resp = cli
        .get(AJAX_PATH)
        .query("action", &action_key())
        .query("token", &TOKEN)
        .send()
        .await;
    let body = resp.0.into_body().into_string().await.unwrap();

    assert!(body.contains("token=secret&step=end"));
}

#[tokio::test]
async fn test_query_token_is_dropped_when_header_authenticates() {
    let (state, _dir) = state(Some("<?php $r = new Redis();"), false);
    let cli = TestClient::new(app(state));

    for (name, value) in [("X-Admin-Token", TOKEN), ("Authorization", "Bearer secret")] {
        let resp = cli
            .get(AJAX_PATH)
            .query("action", &action_key())
            .query("token", &TOKEN)
            .header(name, value)
            .send()
            .await;
        let body = resp.0.into_body().into_string().await.unwrap();

        assert!(body.contains(&format!(
            "href=\"http://localhost{}?action={}&step=end\"",
            AJAX_PATH,
            action_key()
        )));
        assert!(!body.contains("token="));
    }
}

#[tokio::test]
async fn test_https_is_preserved() {
    let (state, _dir) = state(Some("<?php $r = new Redis();"), false);
    let cli = TestClient::new(app(state));

    let resp = cli
        .get(AJAX_PATH)
        .query("action", &action_key())
        .header("X-Admin-Token", TOKEN)
        .header("X-Forwarded-Proto", "https")
        .header("Host", "blog.example.com")
        .send()
        .await;
    let body = resp.0.into_body().into_string().await.unwrap();

    assert!(body.contains("href=\"https://blog.example.com/wp-admin/admin-ajax.php?action="));
}

#[tokio::test]
async fn test_missing_dropin_stops_early() {
    let (state, _dir) = state(None, false);
    let cli = TestClient::new(app(state));

    let (status, body) = ajax(&cli, None, Some(TOKEN)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Can not read object cache file"));
    assert!(!body.contains("Next step"));
}

#[tokio::test]
async fn test_wrong_action_is_rejected() {
    let (state, _dir) = state(Some("<?php $r = new Redis();"), false);
    let cli = TestClient::new(app(state));

    let resp = cli
        .get(AJAX_PATH)
        .query("action", &"heartbeat")
        .header("X-Admin-Token", TOKEN)
        .send()
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    resp.assert_text("0").await;
}

#[tokio::test]
async fn test_plugin_listing() {
    let (state, _dir) = state(None, false);
    let cli = TestClient::new(app(state));

    let resp = cli
        .get(PLUGINS_PATH)
        .header("Authorization", "Bearer secret")
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.0.into_body().into_string().await.unwrap();
    assert_eq!(body.matches("Detect | 开始诊断").count(), 1);
    assert!(body.contains(&format!("admin-ajax.php?action={}", action_key())));
    assert!(body.contains("target=\"_blank\""));

    let resp = cli.get(PLUGINS_PATH).send().await;
    resp.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_backend_api() {
    let (state, _dir) = state(Some("$db = new SQLite3('cache.db');"), false);
    let cli = TestClient::new(app(state));

    let resp = cli
        .get("/api/v1/backend")
        .header("X-Admin-Token", TOKEN)
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.0.into_body().into_string().await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["backend"], "SQLite3");
    assert_eq!(json["readable"], true);
    assert_eq!(json["cache"], "inmem");

    let resp = cli.get("/api/v1/backend").send().await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_healthz() {
    let (state, _dir) = state(None, false);
    let cli = TestClient::new(app(state));

    let resp = cli.get("/healthz").send().await;
    resp.assert_status_is_ok();
    resp.assert_text("ok").await;
}
