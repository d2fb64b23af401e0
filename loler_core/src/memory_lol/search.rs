use log::info;

use super::client::{prepare_usernames, LookupGateway};
use super::dto::UserLookupResult;
use super::normalize::normalize;
use crate::error::Result;

/// One completed lookup, ready for display.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub query: String, // the comma-joined names actually sent
    pub platform: String,
    pub results: Vec<UserLookupResult>,
    pub authenticated: bool,
}

/// Lookup followed by normalization. Blank tokens count as no token.
pub async fn search(
    gateway: &dyn LookupGateway,
    usernames: &[String],
    platform: &str,
    token: Option<&str>,
) -> Result<SearchReport> {
    let query = prepare_usernames(usernames)?;
    let token = token.map(str::trim).filter(|t| !t.is_empty());

    let raw = gateway.lookup(usernames, platform, token).await?;
    let results = normalize(&raw)?;

    info!("Lookup for {} returned {} entries", query, results.len());

    Ok(SearchReport {
        query,
        platform: platform.trim().to_string(),
        results,
        authenticated: token.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::memory_lol::client::into_raw_lookup;
    use crate::memory_lol::dto::RawLookup;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeLookup {
        calls: AtomicUsize,
        body: Value,
    }

    #[async_trait]
    impl LookupGateway for FakeLookup {
        async fn lookup(&self, _: &[String], _: &str, token: Option<&str>) -> Result<RawLookup> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_ne!(token, Some(""));
            into_raw_lookup(self.body.clone())
        }

        async fn verify_token(&self, _: &str) -> Result<Value> {
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn test_search_reports_query_and_auth() {
        let gateway = FakeLookup {
            calls: AtomicUsize::new(0),
            body: json!({ "jack": { "accounts": [] } }),
        };

        let names = vec![" jack ".to_string()];
        let report = search(&gateway, &names, "twitter", Some("  ")).await.unwrap();

        assert_eq!(report.query, "jack");
        assert!(!report.authenticated);
        assert_eq!(report.results.len(), 1);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_validates_before_calling_gateway() {
        let gateway = FakeLookup {
            calls: AtomicUsize::new(0),
            body: json!({}),
        };

        let err = search(&gateway, &[" ".to_string()], "twitter", None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }
}
