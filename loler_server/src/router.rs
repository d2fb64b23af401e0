use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::Uri,
    middleware,
    routing::get,
};
use loler_core::{config::UpstreamConfig, session::redact};
use tracing::{Span, info_span};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use crate::{
    auth::handler::{auth_status, poll_device_auth, start_device_auth},
    docs::{dto::ApiDoc, handler::api_docs},
    error::handle_panic,
    info::handler::info,
    middlewares::handler::bearer,
    search::handler::{search_get, search_post},
    state::ServerState,
};

pub fn router() -> Router {
    let config = UpstreamConfig::from_env();
    let state = Arc::new(ServerState::from(&config));

    app(state)
}

pub fn app(state: Arc<ServerState>) -> Router {
    with_layers(api_routes(), state)
}

fn api_routes() -> Router<Arc<ServerState>> {
    Router::new()
        .route("/search", get(search_get).post(search_post))
        .route("/auth/github", get(poll_device_auth).post(start_device_auth))
        .route("/auth/status", get(auth_status))
        .route_layer(middleware::from_fn(bearer))
}

fn with_layers(api_router: Router<Arc<ServerState>>, state: Arc<ServerState>) -> Router {
    let doc = ApiDoc::openapi();

    Router::new()
        .merge(Redoc::with_url("/redoc", doc))
        .merge(api_router)
        .route("/", get(info))
        .route("/docs", get(api_docs))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

fn request_span(req: &Request) -> Span {
    info_span!(
        "request",
        method = %req.method(),
        uri = %redacted_uri(req.uri()),
    )
}

/// Path and query with any `token` value cut down to its redacted prefix.
fn redacted_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };

    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("token", value)) => format!("token={}", redact(value)),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", uri.path(), query)
}
