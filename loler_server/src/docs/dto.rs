use crate::{auth, info, search};
use loler_core::{
    api::dto::{
        DeviceCodeResponse, ErrorResponse, SearchRequest, SearchResponse, StatusResponse,
        TokenResponse, UsernameInput,
    },
    memory_lol::{AccountRecord, ScreenNameEntry, UserLookupResult},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        info::handler::info,
        search::handler::search_get,
        search::handler::search_post,
        auth::handler::start_device_auth,
        auth::handler::poll_device_auth,
        auth::handler::auth_status,
    ),
    components(schemas(
        info::dto::Info,
        SearchRequest,
        SearchResponse,
        UsernameInput,
        UserLookupResult,
        AccountRecord,
        ScreenNameEntry,
        DeviceCodeResponse,
        TokenResponse,
        StatusResponse,
        ErrorResponse,
    ))
)]
pub struct ApiDoc;
