use std::env;

use log::info;

pub const DEFAULT_MEMORY_LOL_URL: &str = "https://api.memory.lol";
pub const DEFAULT_GITHUB_URL: &str = "https://github.com";
/// OAuth app registered for MemoryLoler's device flow.
pub const DEFAULT_GITHUB_CLIENT_ID: &str = "b8ab5a8c1a2745d514b7";
pub const DEFAULT_USER_AGENT: &str = "MemoryLoler/1.0";
pub const DEFAULT_PLATFORM: &str = "twitter";

/// Endpoints and identity used when talking to Memory.lol and GitHub.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub memory_lol_url: String,
    pub github_url: String,
    pub github_client_id: String,
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            memory_lol_url: DEFAULT_MEMORY_LOL_URL.to_string(),
            github_url: DEFAULT_GITHUB_URL.to_string(),
            github_client_id: DEFAULT_GITHUB_CLIENT_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        Self {
            memory_lol_url: trim_url(load_or("MEMORY_LOL_URL", DEFAULT_MEMORY_LOL_URL)),
            github_url: trim_url(load_or("GITHUB_URL", DEFAULT_GITHUB_URL)),
            github_client_id: load_or("GITHUB_CLIENT_ID", DEFAULT_GITHUB_CLIENT_ID),
            user_agent: load_or("LOLER_USER_AGENT", DEFAULT_USER_AGENT),
        }
    }

    /// Same identity, different hosts. Used to point clients at fakes.
    pub fn with_hosts(memory_lol_url: &str, github_url: &str) -> Self {
        Self {
            memory_lol_url: trim_url(memory_lol_url.to_string()),
            github_url: trim_url(github_url.to_string()),
            ..Self::default()
        }
    }
}

/// Read `key`, falling back to `default` when unset or blank.
pub fn load_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
