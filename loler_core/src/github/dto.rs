use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::SessionToken;

/// A live device-code session as issued by GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceAuthSession {
    pub device_code: String,      // correlation key, never shown
    pub user_code: String,        // typed by the user at verification_uri
    pub verification_uri: String,
    pub expires_in: u64,          // seconds
    #[serde(default = "default_interval")]
    pub interval: u64,            // minimum seconds between polls
}

/// RFC 8628 fallback when the server omits `interval`.
fn default_interval() -> u64 {
    5
}

/// Successful device-flow completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: SessionToken,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenEndpointResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub interval: Option<u64>,
}
