use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::client::split_usernames;
use super::dto::{
    AccountRecord, RawAccount, RawLookup, RawUserEntry, ScreenNameEntry, UserLookupResult,
};
use crate::error::{CoreError, Result};

/// Reshape the upstream lookup payload into display order.
///
/// Entries, accounts and screen names keep the order the upstream sent them
/// in; nothing is sorted by date.
pub fn normalize(raw: &RawLookup) -> Result<Vec<UserLookupResult>> {
    raw.iter()
        .map(|(key, value)| normalize_user(key, value))
        .collect()
}

fn normalize_user(key: &str, value: &Value) -> Result<UserLookupResult> {
    let entry = RawUserEntry::deserialize(value)
        .map_err(|e| CoreError::MalformedUpstreamData(format!("entry '{}': {}", key, e)))?;

    Ok(UserLookupResult {
        username: entry.username.unwrap_or_else(|| key.to_string()),
        accounts: entry.accounts.into_iter().map(normalize_account).collect(),
    })
}

fn normalize_account(account: RawAccount) -> AccountRecord {
    let screen_names = account
        .screen_names
        .into_iter()
        .map(|(name, dates)| ScreenNameEntry {
            name,
            start_date: date_at(&dates, 0),
            end_date: date_at(&dates, 1),
        })
        .collect();

    AccountRecord {
        id_str: account.id_str.unwrap_or_else(|| account.id.to_string()),
        id: account.id,
        screen_names,
    }
}

fn date_at(dates: &Option<Vec<Option<String>>>, index: usize) -> Option<String> {
    dates
        .as_ref()?
        .get(index)?
        .as_ref()
        .filter(|d| !d.is_empty())
        .cloned()
}

/// Queried names that appear nowhere in the results.
///
/// Matching is on the trimmed, lowercased form; the returned names keep the
/// caller's spelling and query order, one per distinct name.
pub fn not_found(query: &str, results: &[UserLookupResult]) -> Vec<String> {
    let found: HashSet<String> = results
        .iter()
        .flat_map(|user| user.accounts.iter())
        .flat_map(|account| account.screen_names.iter())
        .map(|entry| entry.name.trim().to_lowercase())
        .collect();

    let mut seen = HashSet::new();
    split_usernames(query)
        .into_iter()
        .filter(|name| {
            let key = name.to_lowercase();
            !found.contains(&key) && seen.insert(key)
        })
        .collect()
}
