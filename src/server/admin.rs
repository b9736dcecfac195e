// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::sync::Arc;

use poem::{
    handler,
    http::{header, uri::Scheme, StatusCode},
    web::{Data, Html, Query},
    IntoResponse, Request, Response,
};
use reqwest::Url;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{error, warn};

use crate::diagnosis::{
    current_url, Authorizer, Renderer, TokenAuthorizer, ADMIN_CAPABILITY, PERMISSION_DENIED,
    TOOL_ID,
};
use crate::server::AppState;
use crate::types::DiagnosisError;

pub const AJAX_PATH: &str = "/wp-admin/admin-ajax.php";
pub const PLUGINS_PATH: &str = "/wp-admin/plugins.php";
/// Directory the tool is installed under in the plugin listing.
pub const PLUGIN_DIR: &str = "object-cache-diagnosis";

/// Action name the diagnosis endpoint answers to.
pub fn action_key() -> String {
    let digest = format!("{:x}", Sha256::digest(TOOL_ID.as_bytes()));
    digest[..32].to_string()
}

/// Prepends the diagnosis link to the actions of our own plugin entry. Other
/// entries are returned untouched.
pub fn action_links(
    renderer: &Renderer,
    mut actions: Vec<String>,
    plugin_file: &str,
    admin_url: &Url,
) -> Result<Vec<String>, DiagnosisError> {
    if plugin_file
        .to_lowercase()
        .contains(&PLUGIN_DIR.to_lowercase())
    {
        actions.insert(0, renderer.action_link(admin_url, &action_key())?);
    }
    Ok(actions)
}

/// A TLS listener, or a proxy saying it terminated TLS for us.
fn is_https_request(scheme: &Scheme, forwarded_proto: Option<&str>) -> bool {
    *scheme == Scheme::HTTPS
        || forwarded_proto
            .map(|v| v.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
}

fn is_https(req: &Request) -> bool {
    is_https_request(req.scheme(), req.header("X-Forwarded-Proto"))
}

fn request_host(req: &Request) -> String {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.original_uri().authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string())
}

/// What the client asked for, scheme and host included.
pub(crate) fn request_url(req: &Request) -> Option<Url> {
    let path_and_query = req
        .original_uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    current_url(is_https(req), &request_host(req), path_and_query)
}

fn admin_url(req: &Request) -> Option<Url> {
    current_url(is_https(req), &request_host(req), "/wp-admin/")
}

/// Token from `X-Admin-Token` or a bearer `Authorization` header.
pub(crate) fn header_token(req: &Request) -> Option<String> {
    let bearer = || {
        req.header(header::AUTHORIZATION)
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.trim().to_string())
    };
    req.header("X-Admin-Token").map(str::to_string).or_else(bearer)
}

/// Token from the headers, falling back to the query string.
pub(crate) fn caller_token(req: &Request, query_token: Option<&str>) -> Option<String> {
    header_token(req).or_else(|| query_token.map(str::to_string))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenParams {
    token: Option<String>,
}

#[handler]
pub(crate) async fn plugins(
    req: &Request,
    Query(params): Query<TokenParams>,
    Data(state): Data<&Arc<AppState>>,
) -> Response {
    let config = state.config.get_config().await.clone();
    let token = caller_token(req, params.token.as_deref());
    if !TokenAuthorizer::new(token.as_deref(), &config.admin).current_user_can(ADMIN_CAPABILITY) {
        warn!("Plugin listing refused");
        return PERMISSION_DENIED.with_status(StatusCode::FORBIDDEN).into_response();
    }
    let Some(admin_url) = admin_url(req) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut listing = Vec::with_capacity(config.plugins.len());
    for plugin in &config.plugins {
        match action_links(&state.renderer, Vec::new(), plugin, &admin_url) {
            Ok(actions) => listing.push((plugin.clone(), actions)),
            Err(e) => {
                error!("Failed to render actions for plugin={}: {}", plugin, e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    match state.renderer.plugin_listing(&listing) {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            error!("Failed to render plugin listing: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_key_is_stable() {
        let key = action_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, action_key());
    }

    #[test]
    fn test_https_from_listener_or_proxy() {
        assert!(is_https_request(&Scheme::HTTPS, None));
        assert!(is_https_request(&Scheme::HTTP, Some("https")));
        assert!(is_https_request(&Scheme::HTTP, Some(" HTTPS ")));
        assert!(!is_https_request(&Scheme::HTTP, None));
        assert!(!is_https_request(&Scheme::HTTP, Some("http")));
    }

    #[test]
    fn test_plain_request_url_is_http() {
        let req = Request::builder()
            .uri_str("/wp-admin/admin-ajax.php?action=abc")
            .header(header::HOST, "blog.example.com")
            .finish();
        assert!(!is_https(&req));
        assert_eq!(
            request_url(&req).unwrap().as_str(),
            "http://blog.example.com/wp-admin/admin-ajax.php?action=abc"
        );
    }

    #[test]
    fn test_header_token_sources() {
        let req = Request::builder().header("X-Admin-Token", "a").finish();
        assert_eq!(header_token(&req), Some("a".to_string()));
        assert_eq!(caller_token(&req, Some("q")), Some("a".to_string()));

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer b ")
            .finish();
        assert_eq!(header_token(&req), Some("b".to_string()));

        let req = Request::builder().finish();
        assert_eq!(header_token(&req), None);
        assert_eq!(caller_token(&req, Some("q")), Some("q".to_string()));
    }

    #[test]
    fn test_action_links_only_for_own_plugin() {
        let renderer = Renderer::new().unwrap();
        let admin_url = Url::parse("https://example.com/wp-admin/").unwrap();

        let links = action_links(
            &renderer,
            vec!["<a>Deactivate</a>".to_string()],
            "Object-Cache-Diagnosis/object-cache-diagnosis.php",
            &admin_url,
        )
        .unwrap();
        assert_eq!(links.len(), 2);
        assert!(links[0].contains(&format!(
            "https://example.com/wp-admin/admin-ajax.php?action={}",
            action_key()
        )));
        assert!(links[0].contains("Detect | 开始诊断"));
        assert_eq!(links[1], "<a>Deactivate</a>");

        let links = action_links(
            &renderer,
            vec!["<a>Deactivate</a>".to_string()],
            "akismet/akismet.php",
            &admin_url,
        )
        .unwrap();
        assert_eq!(links, vec!["<a>Deactivate</a>".to_string()]);
    }
}
