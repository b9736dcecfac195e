// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::sync::Arc;

use poem::{
    handler,
    http::StatusCode,
    web::{Data, Query},
    Body, Request, Response,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::diagnosis::{
    without_query_arg, ChannelSink, Diagnosis, FileConfigSource, Step, TokenAuthorizer,
};
use crate::server::admin::{action_key, caller_token, header_token, request_url};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct AjaxParams {
    action: Option<String>,
    step: Option<String>,
    token: Option<String>,
}

/// The admin action endpoint. Output is streamed line by line; the response
/// ends as soon as the diagnosis stops, whether it finished or bailed out.
#[handler]
pub(crate) async fn admin_ajax(
    req: &Request,
    Query(params): Query<AjaxParams>,
    Data(state): Data<&Arc<AppState>>,
) -> Response {
    // unknown actions get the host's usual answer
    if params.action.as_deref() != Some(action_key().as_str()) {
        return Response::builder().status(StatusCode::BAD_REQUEST).body("0");
    }
    let Some(mut current) = request_url(req) else {
        return Response::builder().status(StatusCode::BAD_REQUEST).body("0");
    };
    // a query token stays in the next step link only when it is the sole credential
    if header_token(req).is_some() {
        current = without_query_arg(&current, "token");
    }

    let config = state.config.get_config().await.clone();
    let token = caller_token(req, params.token.as_deref());
    let diagnosis = Diagnosis::new(
        Arc::new(TokenAuthorizer::new(token.as_deref(), &config.admin)),
        Arc::new(FileConfigSource::new(&config.object_cache_file)),
        state.cache.clone(),
        state.renderer.clone(),
    )
    .with_rearm_on_end(config.probe.rearm_on_end);
    let step = Step::parse(params.step.as_deref());

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx);
        match diagnosis.run(step, &current, &mut sink).await {
            Ok(outcome) => info!(?outcome, "Diagnosis finished"),
            Err(e) => warn!(code = e.error_code(), "Diagnosis stopped: {}", e),
        }
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|fragment| (Ok::<_, std::io::Error>(fragment), rx))
    });

    Response::builder()
        .content_type("text/html; charset=utf-8")
        .body(Body::from_bytes_stream(Box::pin(stream)))
}
