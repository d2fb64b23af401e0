use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{header, Client};

use super::dto::{DeviceAuthSession, TokenEndpointResponse, TokenGrant};
use crate::config::UpstreamConfig;
use crate::error::{CoreError, Result};
use crate::session::SessionToken;

pub const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Token endpoint error codes that end the session.
const TERMINAL_ERRORS: &[&str] = &[
    "access_denied",
    "unsupported_grant_type",
    "incorrect_client_credentials",
    "incorrect_device_code",
    "device_flow_disabled",
];

/// The two calls of the OAuth device authorization grant.
#[async_trait]
pub trait DeviceFlowGateway: Send + Sync {
    async fn request_device_code(&self) -> Result<DeviceAuthSession>;

    /// `Err(AuthPending)` and `Err(AuthSlowDown)` mean "ask again later".
    async fn poll_for_token(&self, device_code: &str) -> Result<TokenGrant>;
}

/// Classify a token endpoint body.
pub fn classify_token_response(body: &str) -> Result<TokenGrant> {
    let response: TokenEndpointResponse = serde_json::from_str(body).map_err(|_| {
        let preview: String = body.chars().take(100).collect();
        CoreError::Auth(format!("Invalid JSON response from GitHub: {}", preview))
    })?;

    if let Some(access_token) = response.access_token.filter(|t| !t.is_empty()) {
        return Ok(TokenGrant {
            access_token: SessionToken::new(access_token),
            token_type: response.token_type,
            scope: response.scope,
        });
    }

    match response.error.as_deref() {
        Some("slow_down") => Err(CoreError::AuthSlowDown {
            interval: response.interval,
        }),
        Some("expired_token") => Err(CoreError::AuthExpired),
        Some(code) if TERMINAL_ERRORS.contains(&code) => Err(CoreError::Auth(
            response.error_description.unwrap_or_else(|| code.to_string()),
        )),
        _ => Err(CoreError::AuthPending),
    }
}

#[derive(Clone)]
pub struct GithubDeviceClient {
    http: Client,
    base_url: String,
    client_id: String,
}

impl GithubDeviceClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.github_url.clone(),
            client_id: config.github_client_id.clone(),
        }
    }
}

#[async_trait]
impl DeviceFlowGateway for GithubDeviceClient {
    async fn request_device_code(&self) -> Result<DeviceAuthSession> {
        let response = self
            .http
            .post(format!("{}/login/device/code", self.base_url))
            .header(header::ACCEPT, "application/json")
            .form(&[("client_id", self.client_id.as_str())])
            .send()
            .await
            .map_err(|e| CoreError::AuthInit {
                status: 0,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("GitHub device code request failed: {}", status);
            return Err(CoreError::AuthInit {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let session: DeviceAuthSession =
            response.json().await.map_err(|e| CoreError::AuthInit {
                status: status.as_u16(),
                message: e.to_string(),
            })?;

        info!(
            "Device code issued, expires in {}s, interval {}s",
            session.expires_in, session.interval
        );
        Ok(session)
    }

    async fn poll_for_token(&self, device_code: &str) -> Result<TokenGrant> {
        let response = self
            .http
            .post(format!("{}/login/oauth/access_token", self.base_url))
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("device_code", device_code),
                ("client_id", self.client_id.as_str()),
                ("grant_type", DEVICE_GRANT_TYPE),
            ])
            .send()
            .await
            .map_err(|e| CoreError::Auth(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let preview: String = body.chars().take(100).collect();
            warn!("GitHub token exchange failed: {} - {}", status, preview);
            return Err(CoreError::Auth(format!(
                "GitHub token exchange failed: {} - {}",
                status.as_u16(),
                preview
            )));
        }

        let result = classify_token_response(&body);
        match &result {
            Ok(grant) => info!("GitHub issued token {}", grant.access_token),
            Err(e) if e.is_pending() => debug!("Device authorization still pending"),
            Err(e) => warn!("Device authorization failed: {}", e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GithubDeviceClient {
        GithubDeviceClient::new(&UpstreamConfig::with_hosts(&server.uri(), &server.uri()))
    }

    #[test]
    fn test_classify_success() {
        let grant = classify_token_response(
            r#"{"access_token":"gho_x","token_type":"bearer","scope":""}"#,
        )
        .unwrap();
        assert_eq!(grant.access_token.expose(), "gho_x");
        assert_eq!(grant.token_type.as_deref(), Some("bearer"));
    }

    #[test]
    fn test_classify_pending_and_terminal() {
        assert!(matches!(
            classify_token_response(r#"{"error":"authorization_pending"}"#),
            Err(CoreError::AuthPending)
        ));
        assert!(matches!(
            classify_token_response("{}"),
            Err(CoreError::AuthPending)
        ));
        assert!(matches!(
            classify_token_response(r#"{"error":"slow_down","interval":10}"#),
            Err(CoreError::AuthSlowDown { interval: Some(10) })
        ));
        assert!(matches!(
            classify_token_response(r#"{"error":"expired_token"}"#),
            Err(CoreError::AuthExpired)
        ));
        assert!(matches!(
            classify_token_response(r#"{"error":"access_denied"}"#),
            Err(CoreError::Auth(_))
        ));
    }

    #[test]
    fn test_classify_non_json_is_auth_error() {
        assert!(matches!(classify_token_response(""), Err(CoreError::Auth(_))));
        assert!(matches!(
            classify_token_response("<html>oops</html>"),
            Err(CoreError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_request_device_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/device/code"))
            .and(header_is("accept", "application/json"))
            .and(body_string_contains("client_id=b8ab5a8c1a2745d514b7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "dev-123",
                "user_code": "ABCD-1234",
                "verification_uri": "https://github.com/login/device",
                "expires_in": 900,
                "interval": 5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client_for(&server).request_device_code().await.unwrap();
        assert_eq!(session.user_code, "ABCD-1234");
        assert_eq!(session.interval, 5);
    }

    #[tokio::test]
    async fn test_request_device_code_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/device/code"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).request_device_code().await.unwrap_err();
        assert!(matches!(err, CoreError::AuthInit { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_poll_sends_grant_type_and_tolerates_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("device_code=dev-123"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code",
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .poll_for_token("dev-123")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Auth(_)));
    }
}
