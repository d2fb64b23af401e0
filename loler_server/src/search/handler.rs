use std::sync::Arc;

use axum::{
    Extension,
    extract::{Json, Query, State, rejection::JsonRejection},
};
use chrono::{SecondsFormat, Utc};
use log::warn;
use loler_core::{
    api::dto::{ErrorResponse, SearchQuery, SearchRequest, SearchResponse},
    config::DEFAULT_PLATFORM,
    memory_lol::{SearchReport, search, split_usernames},
};

use crate::{error::ErrorServer, middlewares::handler::BearerToken, state::ServerState};

const USERNAMES_REQUIRED: &str = "Usernames are required";

#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    description = "Look up screen-name history for comma-separated usernames",
    responses(
        (status = 200, description = "Success", body = SearchResponse),
        (status = 400, description = "Missing usernames", body = ErrorResponse),
        (status = 404, description = "No data for these usernames", body = ErrorResponse),
        (status = 500, description = "Upstream failure", body = ErrorResponse),
    )
)]
#[axum::debug_handler]
pub async fn search_get(
    State(server_state): State<Arc<ServerState>>,
    Extension(bearer): Extension<BearerToken>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ErrorServer> {
    let usernames = query
        .usernames
        .as_deref()
        .map(split_usernames)
        .unwrap_or_default();

    run_search(&server_state, usernames, query.platform, query.token, bearer).await
}

#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    description = "Look up screen-name history; usernames may be a string or a list",
    responses(
        (status = 200, description = "Success", body = SearchResponse),
        (status = 400, description = "Missing usernames", body = ErrorResponse),
        (status = 404, description = "No data for these usernames", body = ErrorResponse),
        (status = 500, description = "Upstream failure", body = ErrorResponse),
    )
)]
#[axum::debug_handler]
pub async fn search_post(
    State(server_state): State<Arc<ServerState>>,
    Extension(bearer): Extension<BearerToken>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ErrorServer> {
    // An unreadable body is treated like one without usernames.
    let request = match body {
        Ok(Json(request)) => request,
        Err(e) => {
            warn!("Unreadable search body: {}", e);
            SearchRequest::default()
        }
    };

    let usernames = request
        .usernames
        .map(|u| u.into_names())
        .unwrap_or_default();

    run_search(&server_state, usernames, request.platform, request.token, bearer).await
}

async fn run_search(
    server_state: &ServerState,
    usernames: Vec<String>,
    platform: Option<String>,
    token: Option<String>,
    bearer: BearerToken,
) -> Result<Json<SearchResponse>, ErrorServer> {
    if usernames.is_empty() {
        return Err(ErrorServer::bad_request("validation", USERNAMES_REQUIRED));
    }

    let platform = platform
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PLATFORM.to_string());
    let token = token.filter(|t| !t.trim().is_empty()).or(bearer.0);

    let report = search(
        server_state.lookup(),
        &usernames,
        &platform,
        token.as_deref(),
    )
    .await?;

    Ok(Json(into_response(report)))
}

fn into_response(report: SearchReport) -> SearchResponse {
    SearchResponse {
        success: true,
        data: report.results,
        platform: report.platform,
        query: report.query,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        authenticated: report.authenticated,
    }
}
