use log::info;
use loler_core::{
    config::UpstreamConfig,
    github::{DeviceFlowGateway, GithubDeviceClient},
    memory_lol::{search, LookupGateway, MemoryLolClient, SearchReport},
    session::SessionToken,
    Result,
};
use serde_json::Value;

use crate::api::ServerClient;

/// Where the CLI sends its work: through `loler_server`, or straight to the upstreams.
pub enum Backend {
    Server(ServerClient),
    Direct {
        lookup: MemoryLolClient,
        device_flow: GithubDeviceClient,
    },
}

impl Backend {
    pub fn server() -> Self {
        Backend::Server(ServerClient::from_env())
    }

    pub fn direct(config: &UpstreamConfig) -> Self {
        Backend::Direct {
            lookup: MemoryLolClient::new(config),
            device_flow: GithubDeviceClient::new(config),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Backend::Server(_) => "server",
            Backend::Direct { .. } => "direct",
        }
    }

    pub async fn search(
        &self,
        usernames: &[String],
        platform: &str,
        token: Option<&SessionToken>,
    ) -> Result<SearchReport> {
        let token = token.map(SessionToken::expose);
        info!("Searching {} name(s) via {}", usernames.len(), self.describe());

        match self {
            Backend::Server(client) => client.search(usernames, platform, token).await,
            Backend::Direct { lookup, .. } => search(lookup, usernames, platform, token).await,
        }
    }

    pub fn device_flow(&self) -> &dyn DeviceFlowGateway {
        match self {
            Backend::Server(client) => client,
            Backend::Direct { device_flow, .. } => device_flow,
        }
    }

    /// Memory.lol's view of the token, plus whether it looks accepted.
    pub async fn status(&self, token: &SessionToken) -> Result<(bool, Value)> {
        match self {
            Backend::Server(client) => {
                let status = client.status(token).await?;
                Ok((status.authenticated, status.memory_lol_status))
            }
            Backend::Direct { lookup, .. } => {
                let value = lookup.verify_token(token.expose()).await?;
                Ok((value.get("error").is_none(), value))
            }
        }
    }
}
