use std::sync::Arc;

use axum::{
    Extension,
    extract::{Json, Query, State},
};
use log::{error, info, warn};
use loler_core::{
    api::dto::{DeviceCodeResponse, ErrorResponse, PollQuery, StatusQuery, StatusResponse, TokenResponse},
    memory_lol::LookupGateway,
};
use serde_json::{Value, json};

use crate::{error::ErrorServer, middlewares::handler::BearerToken, state::ServerState};

#[utoipa::path(
    post,
    path = "/auth/github",
    description = "Start a GitHub device authorization",
    responses(
        (status = 200, description = "Device code issued", body = DeviceCodeResponse),
        (status = 500, description = "GitHub refused the request", body = ErrorResponse),
    )
)]
#[axum::debug_handler]
pub async fn start_device_auth(
    State(server_state): State<Arc<ServerState>>,
) -> Result<Json<DeviceCodeResponse>, ErrorServer> {
    let session = server_state
        .device_flow()
        .request_device_code()
        .await
        .map_err(|e| {
            error!("GitHub auth error: {}", e);
            ErrorServer::from(e)
        })?;

    info!("Issued device code, expires in {}s", session.expires_in);

    Ok(Json(DeviceCodeResponse::from(session)))
}

#[utoipa::path(
    get,
    path = "/auth/github",
    params(PollQuery),
    description = "Exchange a device code for an access token and check it against Memory.lol",
    responses(
        (status = 200, description = "Authorized", body = TokenResponse),
        (status = 400, description = "Missing device code, still pending, or expired", body = ErrorResponse),
        (status = 500, description = "Authorization failed", body = ErrorResponse),
    )
)]
#[axum::debug_handler]
pub async fn poll_device_auth(
    State(server_state): State<Arc<ServerState>>,
    Query(query): Query<PollQuery>,
) -> Result<Json<TokenResponse>, ErrorServer> {
    let device_code = query
        .device_code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ErrorServer::bad_request("validation", "Device code is required"))?;

    let grant = server_state
        .device_flow()
        .poll_for_token(&device_code)
        .await
        .map_err(|e| {
            if !e.is_pending() {
                error!("Token exchange error: {}", e);
            }
            ErrorServer::from(e)
        })?;

    let memory_lol_status =
        memory_lol_status(server_state.lookup(), grant.access_token.expose()).await;

    Ok(Json(TokenResponse {
        success: true,
        access_token: grant.access_token.expose().to_string(),
        token_type: grant.token_type,
        scope: grant.scope,
        memory_lol_status,
    }))
}

#[utoipa::path(
    get,
    path = "/auth/status",
    params(StatusQuery),
    description = "Report whether a bearer token is accepted by Memory.lol",
    responses(
        (status = 200, description = "Status checked", body = StatusResponse),
        (status = 400, description = "Missing token", body = ErrorResponse),
    )
)]
#[axum::debug_handler]
pub async fn auth_status(
    State(server_state): State<Arc<ServerState>>,
    Extension(bearer): Extension<BearerToken>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ErrorServer> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .or(bearer.0)
        .ok_or_else(|| ErrorServer::bad_request("validation", "Token is required"))?;

    let memory_lol_status = memory_lol_status(server_state.lookup(), &token).await;
    let authenticated = memory_lol_status.get("error").is_none();

    Ok(Json(StatusResponse {
        success: true,
        authenticated,
        memory_lol_status,
    }))
}

/// Verification never fails the request; problems are reported inline.
async fn memory_lol_status(lookup: &dyn LookupGateway, token: &str) -> Value {
    match lookup.verify_token(token).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Memory.lol verification failed: {}", e);
            json!({ "error": "Memory.lol verification failed", "details": e.to_string() })
        }
    }
}
