use std::fmt;

use async_trait::async_trait;
use log::{debug, error};
use loler_core::{
    api::dto::{
        DeviceCodeResponse, ErrorResponse, SearchRequest, SearchResponse, StatusResponse,
        TokenResponse, UsernameInput,
    },
    config::load_or,
    github::{DeviceAuthSession, DeviceFlowGateway, TokenGrant},
    memory_lol::SearchReport,
    session::SessionToken,
    CoreError, Result,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";

pub enum Endpoints {
    Search,
    DeviceAuth,
    AuthStatus,
}

impl Endpoints {
    pub fn at(&self, backend_url: &str) -> String {
        format!("{}{}", backend_url.trim_end_matches('/'), self)
    }
}

impl fmt::Display for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Endpoints::Search => write!(f, "/search"),
            &Endpoints::DeviceAuth => write!(f, "/auth/github"),
            &Endpoints::AuthStatus => write!(f, "/auth/status"),
        }
    }
}

/// Talks to a running `loler_server` instead of the upstreams directly.
#[derive(Clone)]
pub struct ServerClient {
    client: Client,
    backend_url: String,
}

impl ServerClient {
    pub fn new(backend_url: &str) -> Self {
        let client = Client::new();

        Self {
            client,
            backend_url: backend_url.to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(&load_or("BACKEND_URL", DEFAULT_BACKEND_URL))
    }

    pub async fn search(
        &self,
        usernames: &[String],
        platform: &str,
        token: Option<&str>,
    ) -> Result<SearchReport> {
        let url = Endpoints::Search.at(&self.backend_url);
        debug!("Making search request to: {}", url);

        let request = SearchRequest {
            usernames: Some(UsernameInput::Many(usernames.to_vec())),
            platform: Some(platform.to_string()),
            token: token.map(str::to_string),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let body: SearchResponse = read_body(response).await?;

        Ok(SearchReport {
            query: body.query,
            platform: body.platform,
            results: body.data,
            authenticated: body.authenticated,
        })
    }

    pub async fn status(&self, token: &SessionToken) -> Result<StatusResponse> {
        let url = Endpoints::AuthStatus.at(&self.backend_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.expose())
            .send()
            .await?;

        read_body(response).await
    }
}

#[async_trait]
impl DeviceFlowGateway for ServerClient {
    async fn request_device_code(&self) -> Result<DeviceAuthSession> {
        let url = Endpoints::DeviceAuth.at(&self.backend_url);

        let response = self.client.post(&url).send().await?;
        let body: DeviceCodeResponse = read_body(response).await?;

        Ok(DeviceAuthSession::from(body))
    }

    async fn poll_for_token(&self, device_code: &str) -> Result<TokenGrant> {
        let url = Endpoints::DeviceAuth.at(&self.backend_url);

        let response = self
            .client
            .get(&url)
            .query(&[("device_code", device_code)])
            .send()
            .await?;
        let body: TokenResponse = read_body(response).await?;

        Ok(TokenGrant {
            access_token: SessionToken::new(body.access_token),
            token_type: body.token_type,
            scope: body.scope,
        })
    }
}

/// Decode a success body, or rebuild the server's error from its `code`.
async fn read_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&text)
            .map_err(|e| CoreError::MalformedUpstreamData(e.to_string()));
    }

    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => Err(body.into_core()),
        Err(_) => {
            error!("Server responded with {}: {}", status, text);
            Err(CoreError::Upstream {
                status: status.as_u16(),
                message: text.chars().take(100).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_endpoints_join_base() {
        assert_eq!(
            Endpoints::Search.at("http://localhost:3000/"),
            "http://localhost:3000/search"
        );
        assert_eq!(Endpoints::DeviceAuth.to_string(), "/auth/github");
    }

    #[tokio::test]
    async fn test_search_posts_names_and_reads_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{
                    "username": "alice",
                    "accounts": [{
                        "id": 1,
                        "id_str": "1",
                        "screen_names": [{ "name": "alice", "start_date": "2020-01-01", "end_date": null }]
                    }]
                }],
                "platform": "twitter",
                "query": "alice,bob",
                "timestamp": "2024-01-01T00:00:00.000Z",
                "authenticated": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServerClient::new(&server.uri());
        let names = vec!["alice".to_string(), "bob".to_string()];
        let report = client.search(&names, "twitter", None).await.unwrap();

        assert_eq!(report.query, "alice,bob");
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].accounts[0].screen_names[0].name, "alice");
        assert!(!report.authenticated);
    }

    #[tokio::test]
    async fn test_search_rebuilds_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": "No data found for these usernames",
                "code": "not_found"
            })))
            .mount(&server)
            .await;

        let client = ServerClient::new(&server.uri());
        let err = client
            .search(&["ghost".to_string()], "twitter", None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::UpstreamNotFound));
    }

    #[tokio::test]
    async fn test_poll_maps_pending_and_slow_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/github"))
            .and(query_param("device_code", "dev-1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "error": "Authentication not completed",
                "code": "auth_pending",
                "message": "Please complete the GitHub authentication process"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/github"))
            .and(query_param("device_code", "dev-2"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "error": "Authentication not completed",
                "code": "auth_pending",
                "interval": 10
            })))
            .mount(&server)
            .await;

        let client = ServerClient::new(&server.uri());

        let err = client.poll_for_token("dev-1").await.unwrap_err();
        assert!(matches!(err, CoreError::AuthPending));

        let err = client.poll_for_token("dev-2").await.unwrap_err();
        assert!(matches!(err, CoreError::AuthSlowDown { interval: Some(10) }));
    }

    #[tokio::test]
    async fn test_poll_success_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/github"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "access_token": "gho_abc",
                "token_type": "bearer",
                "scope": "",
                "memory_lol_status": {}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/status"))
            .and(header("authorization", "Bearer gho_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "authenticated": true,
                "memory_lol_status": { "tier": "elevated" }
            })))
            .mount(&server)
            .await;

        let client = ServerClient::new(&server.uri());
        let grant = client.poll_for_token("dev-1").await.unwrap();
        assert_eq!(grant.access_token.expose(), "gho_abc");

        let status = client.status(&grant.access_token).await.unwrap();
        assert!(status.authenticated);
    }

    #[tokio::test]
    async fn test_server_errors_keep_message_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/github"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "Failed to initiate GitHub authentication",
                "code": "auth_init",
                "details": "Service Unavailable",
                "status": 503
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/github"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "Failed to complete authentication",
                "code": "auth_error",
                "details": "access_denied"
            })))
            .mount(&server)
            .await;

        let client = ServerClient::new(&server.uri());

        let err = client.request_device_code().await.unwrap_err();
        assert!(matches!(err, CoreError::AuthInit { status: 503, .. }));
        assert_eq!(
            err.to_string(),
            "GitHub device code request failed: 503 Service Unavailable"
        );

        let err = client.poll_for_token("dev-1").await.unwrap_err();
        assert_eq!(err.to_string(), "Authentication failed: access_denied");
    }

    #[tokio::test]
    async fn test_unstructured_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/github"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = ServerClient::new(&server.uri());
        let err = client.request_device_code().await.unwrap_err();

        assert!(matches!(err, CoreError::Upstream { status: 502, .. }));
    }
}
