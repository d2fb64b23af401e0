use std::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use loler_core::{CoreError, api::dto::{ErrorResponse, NOT_COMPLETED}};

#[derive(Debug)]
pub struct ErrorServer {
    pub status: u16,
    pub body: ErrorResponse,
}

impl ErrorServer {
    pub fn bad_request(code: &str, error: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST.into(),
            body: ErrorResponse::new(code, error),
        }
    }
}

impl std::fmt::Display for ErrorServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.body.error)
    }
}

impl From<CoreError> for ErrorServer {
    fn from(err: CoreError) -> Self {
        let code = err.code();
        let (status, mut body) = match &err {
            CoreError::Validation(message) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new(code, message.clone()))
            }
            CoreError::UpstreamNotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new(code, err.to_string()).with_message(
                    "This could be due to limited access (60-day restriction) or usernames not existing",
                ),
            ),
            CoreError::Upstream { .. }
            | CoreError::Transport(_)
            | CoreError::MalformedUpstreamData(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(code, "Failed to fetch data from Memory.lol"),
            ),
            CoreError::AuthInit { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(code, "Failed to initiate GitHub authentication"),
            ),
            CoreError::AuthPending | CoreError::AuthSlowDown { .. } => {
                let mut body = ErrorResponse::new(code, NOT_COMPLETED)
                    .with_message("Please complete the GitHub authentication process");
                // 0 still marks a slow_down when GitHub named no interval.
                if let CoreError::AuthSlowDown { interval } = &err {
                    body.interval = Some(interval.unwrap_or(0));
                }
                (StatusCode::BAD_REQUEST, body)
            }
            CoreError::AuthExpired => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(code, err.to_string())
                    .with_message("Start a new GitHub authentication"),
            ),
            CoreError::Auth(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(code, "Failed to complete authentication"),
            ),
            CoreError::Storage(_) | CoreError::Serialization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(code, "Internal error"),
            ),
        };

        // Inner message only, so a client rebuilding the variant reads the same text.
        body.details = err.detail();
        body.status = err.upstream_status();

        Self {
            status: status.into(),
            body,
        }
    }
}

impl IntoResponse for ErrorServer {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// Last-resort response for a panicking handler. Only the reference leaves the process.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let reference = uuid::Uuid::new_v4().to_string();
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!("Unexpected fault {}: {}", reference, detail);

    let mut body = ErrorResponse::new("internal", "Unexpected error")
        .with_message("Please retry or return home");
    body.reference = Some(reference);

    ErrorServer {
        status: StatusCode::INTERNAL_SERVER_ERROR.into(),
        body,
    }
    .into_response()
}
