use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("No data found for these usernames")]
    UpstreamNotFound,

    #[error("Upstream returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitHub device code request failed: {status} {message}")]
    AuthInit { status: u16, message: String },

    #[error("Authentication not completed")]
    AuthPending,

    /// The token endpoint asked us to back off. `interval` is the new
    /// minimum when GitHub supplied one.
    #[error("Polling too fast")]
    AuthSlowDown { interval: Option<u64> },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Device code expired")]
    AuthExpired,

    #[error("Malformed upstream data: {0}")]
    MalformedUpstreamData(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Stable identifier used on the wire so a client can rebuild the variant.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::UpstreamNotFound => "not_found",
            CoreError::Upstream { .. } | CoreError::Transport(_) => "upstream",
            CoreError::AuthInit { .. } => "auth_init",
            CoreError::AuthPending | CoreError::AuthSlowDown { .. } => "auth_pending",
            CoreError::Auth(_) => "auth_error",
            CoreError::AuthExpired => "auth_expired",
            CoreError::MalformedUpstreamData(_) => "malformed_upstream",
            CoreError::Storage(_) | CoreError::Serialization(_) => "storage",
        }
    }

    /// The variant's inner message, without the display prefix.
    pub fn detail(&self) -> Option<String> {
        match self {
            CoreError::Upstream { message, .. } | CoreError::AuthInit { message, .. } => {
                Some(message.clone())
            }
            CoreError::Auth(message) | CoreError::MalformedUpstreamData(message) => {
                Some(message.clone())
            }
            CoreError::Transport(e) => Some(e.to_string()),
            CoreError::Storage(e) => Some(e.to_string()),
            CoreError::Serialization(e) => Some(e.to_string()),
            _ => None,
        }
    }

    /// Status code returned by the upstream, when the variant carries one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            CoreError::Upstream { status, .. } | CoreError::AuthInit { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Rebuild an error from a wire `code`, its inner message and the
    /// upstream status when one was sent.
    pub fn from_code(
        code: &str,
        message: String,
        status: Option<u16>,
        interval: Option<u64>,
    ) -> Self {
        let status = status.unwrap_or(500);
        match code {
            "validation" => CoreError::Validation(message),
            "not_found" => CoreError::UpstreamNotFound,
            "auth_init" => CoreError::AuthInit { status, message },
            "auth_pending" if interval.is_some() => CoreError::AuthSlowDown {
                interval: interval.filter(|i| *i > 0),
            },
            "auth_pending" => CoreError::AuthPending,
            "auth_error" => CoreError::Auth(message),
            "auth_expired" => CoreError::AuthExpired,
            "malformed_upstream" => CoreError::MalformedUpstreamData(message),
            _ => CoreError::Upstream { status, message },
        }
    }

    /// True for the steady "keep waiting" outcomes of a token poll.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            CoreError::AuthPending | CoreError::AuthSlowDown { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_wire() {
        let cases = [
            CoreError::Validation("Usernames are required".to_string()),
            CoreError::UpstreamNotFound,
            CoreError::AuthPending,
            CoreError::Auth("access_denied".to_string()),
            CoreError::AuthExpired,
            CoreError::MalformedUpstreamData("bad".to_string()),
        ];

        for err in cases {
            let rebuilt = CoreError::from_code(err.code(), err.to_string(), None, None);
            assert_eq!(rebuilt.code(), err.code());
        }
    }

    #[test]
    fn test_slow_down_is_pending() {
        let err = CoreError::from_code("auth_pending", String::new(), None, Some(10));
        assert!(matches!(err, CoreError::AuthSlowDown { interval: Some(10) }));
        assert!(err.is_pending());
        assert!(!CoreError::AuthExpired.is_pending());

        let err = CoreError::from_code("auth_pending", String::new(), None, Some(0));
        assert!(matches!(err, CoreError::AuthSlowDown { interval: None }));
    }

    #[test]
    fn test_detail_and_status_rebuild_same_error() {
        let cases = [
            CoreError::AuthInit {
                status: 503,
                message: "Service Unavailable".to_string(),
            },
            CoreError::Upstream {
                status: 502,
                message: "bad gateway".to_string(),
            },
            CoreError::Auth("access_denied".to_string()),
            CoreError::MalformedUpstreamData("expected value".to_string()),
        ];

        for err in cases {
            let message = err.detail().unwrap();
            let rebuilt = CoreError::from_code(err.code(), message, err.upstream_status(), None);
            assert_eq!(rebuilt.to_string(), err.to_string());
            assert_eq!(rebuilt.upstream_status(), err.upstream_status());
        }
    }
}
