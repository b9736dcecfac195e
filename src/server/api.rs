// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::sync::Arc;

use poem::Request;
use poem_openapi::{param::Query, payload::Json, ApiResponse, Object, OpenApi};
use tracing::info;

use crate::diagnosis::{
    classify, Authorizer, Backend, ConfigSource, FileConfigSource, TokenAuthorizer,
    ADMIN_CAPABILITY,
};
use crate::server::admin::caller_token;
use crate::server::AppState;
use crate::types::ErrorResponse;

#[derive(Object, Debug)]
pub struct BackendReport {
    /// Object cache drop-in that was inspected.
    pub path: String,
    pub readable: bool,
    /// Backend label, `Unknown` when nothing matched or the file is unreadable.
    pub backend: String,
    /// Backend the diagnostic itself talks to.
    pub cache: String,
}

#[derive(ApiResponse)]
pub enum BackendResponse {
    #[oai(status = 200)]
    Ok(Json<BackendReport>),
    #[oai(status = 401)]
    Unauthorized(Json<ErrorResponse>),
}

pub struct StatusApi {
    state: Arc<AppState>,
}

impl StatusApi {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl StatusApi {
    /// Classify the configured object cache without touching the cache.
    #[oai(path = "/backend", method = "get")]
    async fn backend(&self, request: &Request, Query(token): Query<Option<String>>) -> BackendResponse {
        let config = self.state.config.get_config().await.clone();
        let token = caller_token(request, token.as_deref());
        if !TokenAuthorizer::new(token.as_deref(), &config.admin).current_user_can(ADMIN_CAPABILITY) {
            return BackendResponse::Unauthorized(Json(ErrorResponse::new(
                "Insufficient permissions",
                "UNAUTHORIZED",
                401,
            )));
        }

        let source = FileConfigSource::new(&config.object_cache_file);
        let readable = source.is_readable();
        let backend = if readable {
            source
                .read_to_string()
                .map(|content| classify(&content))
                .unwrap_or(Backend::Unknown)
        } else {
            Backend::Unknown
        };
        info!(path = source.path(), %backend, "Backend report");

        BackendResponse::Ok(Json(BackendReport {
            path: source.path().to_string(),
            readable,
            backend: backend.label().to_string(),
            cache: self.state.cache.name().to_string(),
        }))
    }
}
