use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Upstream payload as received: query-key to account-object, in response order.
pub type RawLookup = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScreenNameEntry {
    pub name: String,
    pub start_date: Option<String>, // None: first sighting unknown
    pub end_date: Option<String>,   // None: still in use
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccountRecord {
    pub id: u64,
    pub id_str: String,
    pub screen_names: Vec<ScreenNameEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserLookupResult {
    pub username: String,
    pub accounts: Vec<AccountRecord>, // empty: no accounts found
}

/// How a screen name's known lifetime reads to a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSpan<'a> {
    Unknown,
    Ongoing { since: &'a str },
    Range { start: &'a str, end: &'a str },
}

impl fmt::Display for DateSpan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSpan::Unknown => write!(f, "date unknown"),
            DateSpan::Ongoing { since } => write!(f, "ongoing since {}", since),
            DateSpan::Range { start, end } => write!(f, "{} - {}", start, end),
        }
    }
}

impl ScreenNameEntry {
    pub fn span(&self) -> DateSpan<'_> {
        match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (None, _) => DateSpan::Unknown,
            (Some(since), None) => DateSpan::Ongoing { since },
            (Some(start), Some(end)) => DateSpan::Range { start, end },
        }
    }
}

impl UserLookupResult {
    pub fn screen_name_count(&self) -> usize {
        self.accounts.iter().map(|a| a.screen_names.len()).sum()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawUserEntry {
    #[serde(default, alias = "screen-name")]
    pub username: Option<String>,
    pub accounts: Vec<RawAccount>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAccount {
    pub id: u64,
    #[serde(default, alias = "id-str")]
    pub id_str: Option<String>,
    /// name -> [start, end]; either side may be null or missing.
    #[serde(alias = "screen-names")]
    pub screen_names: IndexMap<String, Option<Vec<Option<String>>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: Option<&str>, end: Option<&str>) -> ScreenNameEntry {
        ScreenNameEntry {
            name: "jack".to_string(),
            start_date: start.map(String::from),
            end_date: end.map(String::from),
        }
    }

    #[test]
    fn test_null_dates_are_not_conflated() {
        let unknown = entry(None, None);
        let ongoing = entry(Some("2019-01-02"), None);

        assert_eq!(unknown.span(), DateSpan::Unknown);
        assert_eq!(unknown.span().to_string(), "date unknown");
        assert_eq!(ongoing.span().to_string(), "ongoing since 2019-01-02");
        assert_ne!(unknown.span(), ongoing.span());
    }

    #[test]
    fn test_missing_start_is_unknown_even_with_end() {
        let e = entry(None, Some("2020-05-05"));
        assert_eq!(e.span(), DateSpan::Unknown);
    }

    #[test]
    fn test_range_display() {
        let e = entry(Some("2018-01-01"), Some("2020-05-05"));
        assert_eq!(e.span().to_string(), "2018-01-01 - 2020-05-05");
    }
}
