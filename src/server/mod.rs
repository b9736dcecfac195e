// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

mod admin;
mod ajax;
mod api;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use poem::{
    get, handler,
    listener::TcpListener,
    middleware::{NormalizePath, Tracing, TrailingSlash},
    Endpoint, EndpointExt, Route, Server,
};
use poem_openapi::OpenApiService;
use tracing::info;

use crate::cache::ObjectCache;
use crate::config::ConfigManager;
use crate::diagnosis::Renderer;

pub use admin::{action_key, action_links, AJAX_PATH, PLUGINS_PATH, PLUGIN_DIR};
pub use api::{BackendReport, StatusApi};

/// Shared by every request. The configuration may be reloaded underneath.
pub struct AppState {
    pub config: Arc<ConfigManager>,
    pub cache: Arc<dyn ObjectCache>,
    pub renderer: Arc<Renderer>,
}

impl AppState {
    pub fn new(config: Arc<ConfigManager>, cache: Arc<dyn ObjectCache>) -> Result<Self> {
        let renderer = Renderer::new()
            .map_err(|e| anyhow::anyhow!("Failed to load templates: {}", e))?;
        Ok(Self {
            config,
            cache,
            renderer: Arc::new(renderer),
        })
    }
}

#[handler]
async fn healthz() -> &'static str {
    "ok"
}

pub fn app(state: Arc<AppState>) -> impl Endpoint {
    let api_service = OpenApiService::new(
        StatusApi::new(state.clone()),
        "Object Cache Diagnosis",
        env!("CARGO_PKG_VERSION"),
    )
    .server("/api/v1");
    let docs = api_service.swagger_ui();

    Route::new()
        .at(AJAX_PATH, get(ajax::admin_ajax))
        .at(PLUGINS_PATH, get(admin::plugins))
        .at("/healthz", get(healthz))
        .nest("/api/v1", api_service)
        .nest("/docs", docs)
        .with(Tracing)
        .with(NormalizePath::new(TrailingSlash::Trim))
        .data(state)
}

pub async fn start(listen: &str, state: Arc<AppState>) -> Result<()> {
    info!(
        "Listening on {}, diagnosis at {}?action={}",
        listen,
        AJAX_PATH,
        action_key()
    );
    let listener = TcpListener::bind(listen.to_string());
    Server::new(listener)
        .run_with_graceful_shutdown(
            app(state),
            async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received, stopping server...");
            },
            None,
        )
        .await?;

    Ok(())
}
