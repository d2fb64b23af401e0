use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};

use super::dto::RawLookup;
use crate::config::UpstreamConfig;
use crate::error::{CoreError, Result};
use crate::session::redact;

/// Read access to the Memory.lol history index.
#[async_trait]
pub trait LookupGateway: Send + Sync {
    /// Fetch the raw screen-name history for `usernames` on `platform`.
    async fn lookup(
        &self,
        usernames: &[String],
        platform: &str,
        token: Option<&str>,
    ) -> Result<RawLookup>;

    /// Ask Memory.lol what access tier `token` grants. Display only.
    async fn verify_token(&self, token: &str) -> Result<Value>;
}

/// Split a comma-separated query into trimmed, non-empty names.
pub fn split_usernames(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Trim every name and join with a single comma.
pub fn prepare_usernames(usernames: &[String]) -> Result<String> {
    let names: Vec<&str> = usernames
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(CoreError::Validation("Usernames are required".to_string()));
    }

    Ok(names.join(","))
}

fn prepare_platform(platform: &str) -> Result<&str> {
    let platform = platform.trim();
    if platform.is_empty() {
        return Err(CoreError::Validation("Platform is required".to_string()));
    }
    Ok(platform)
}

/// Turn a decoded body into ordered (key, account-object) pairs.
pub(crate) fn into_raw_lookup(body: Value) -> Result<RawLookup> {
    match body {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect()),
        other => Err(CoreError::MalformedUpstreamData(format!(
            "expected an object or array, got {}",
            other
        ))),
    }
}

/// A single-name query can come back as the bare entry `{"accounts": [...]}`.
fn keyed_by_query(body: Value, joined: &str) -> Value {
    let bare = !joined.contains(',') && body.get("accounts").is_some_and(Value::is_array);
    if !bare {
        return body;
    }

    let mut keyed = serde_json::Map::new();
    keyed.insert(joined.to_string(), body);
    Value::Object(keyed)
}

#[derive(Clone)]
pub struct MemoryLolClient {
    http: Client,
    base_url: String,
    user_agent: String,
}

impl MemoryLolClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.memory_lol_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    fn lookup_url(&self, platform: &str, joined: &str) -> String {
        format!(
            "{}/v1/{}/{}",
            self.base_url,
            urlencoding::encode(platform),
            urlencoding::encode(joined)
        )
    }
}

#[async_trait]
impl LookupGateway for MemoryLolClient {
    async fn lookup(
        &self,
        usernames: &[String],
        platform: &str,
        token: Option<&str>,
    ) -> Result<RawLookup> {
        let joined = prepare_usernames(usernames)?;
        let platform = prepare_platform(platform)?;

        let mut request = self
            .http
            .get(self.lookup_url(platform, &joined))
            .header(header::USER_AGENT, &self.user_agent);

        match token {
            Some(token) => {
                info!("Authenticated lookup with token: {}", redact(token));
                request = request.bearer_auth(token);
            }
            None => info!("Unauthenticated lookup"),
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("Memory.lol has no data for {}", joined);
            return Err(CoreError::UpstreamNotFound);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Memory.lol lookup failed with status {}", status);
            return Err(CoreError::Upstream {
                status: status.as_u16(),
                message: message.chars().take(100).collect(),
            });
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| CoreError::MalformedUpstreamData(e.to_string()))?;

        into_raw_lookup(keyed_by_query(value, &joined))
    }

    async fn verify_token(&self, token: &str) -> Result<Value> {
        let response = self
            .http
            .get(format!("{}/v1/tw/twitter", self.base_url))
            .header(header::USER_AGENT, &self.user_agent)
            .bearer_auth(token)
            .send()
            .await?;

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        let text = response.text().await?;

        if is_json {
            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                return Ok(value);
            }
        }

        warn!("Memory.lol returned non-JSON status body");
        Ok(json!({
            "error": "Memory.lol returned non-JSON",
            "details": text,
        }))
    }
}
