use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::error::CoreError;
use crate::github::DeviceAuthSession;
use crate::memory_lol::{split_usernames, UserLookupResult};

pub const NOT_COMPLETED: &str = "Authentication not completed";

#[derive(Debug, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Comma-separated usernames.
    pub usernames: Option<String>,
    pub platform: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UsernameInput {
    One(String),
    Many(Vec<String>),
}

impl UsernameInput {
    pub fn into_names(self) -> Vec<String> {
        match self {
            UsernameInput::One(csv) => split_usernames(&csv),
            UsernameInput::Many(list) => list.iter().flat_map(|n| split_usernames(n)).collect(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub usernames: Option<UsernameInput>,
    pub platform: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub success: bool,
    pub data: Vec<UserLookupResult>,
    pub platform: String,
    pub query: String,
    pub timestamp: String,
    pub authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceCodeResponse {
    pub success: bool,
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    pub interval: u64,
}

impl From<DeviceAuthSession> for DeviceCodeResponse {
    fn from(session: DeviceAuthSession) -> Self {
        Self {
            success: true,
            device_code: session.device_code,
            user_code: session.user_code,
            verification_uri: session.verification_uri,
            expires_in: session.expires_in,
            interval: session.interval,
        }
    }
}

impl From<DeviceCodeResponse> for DeviceAuthSession {
    fn from(response: DeviceCodeResponse) -> Self {
        Self {
            device_code: response.device_code,
            user_code: response.user_code,
            verification_uri: response.verification_uri,
            expires_in: response.expires_in,
            interval: response.interval,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PollQuery {
    pub device_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub success: bool,
    pub access_token: String,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    #[schema(value_type = Object)]
    pub memory_lol_status: Value,
}

#[derive(Debug, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
    pub authenticated: bool,
    #[schema(value_type = Object)]
    pub memory_lol_status: Value,
}

/// Failure body shared by every route.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Status the upstream answered with, for upstream and auth-init failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// New minimum poll interval after a `slow_down`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Opaque id for an unexpected fault; matches a server log line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.to_string(),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Back into the error taxonomy on the client side.
    pub fn into_core(self) -> CoreError {
        let text = self.details.unwrap_or(self.error);
        CoreError::from_code(&self.code, text, self.status, self.interval)
    }
}
