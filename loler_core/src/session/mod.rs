pub mod storage;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use storage::{MemoryTokenStore, SessionTokenHolder, SledTokenStore, TokenStore};

/// Key the bearer token is persisted under.
pub const TOKEN_KEY: &str = "memoryloler_auth_token";

/// First ten characters followed by an ellipsis; safe to log.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(10).collect();
    format!("{}...", prefix)
}

/// Opaque bearer credential for the Memory.lol elevated tier.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({})", redact(&self.0))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted_in_debug_and_display() {
        let token = SessionToken::new("gho_abcdefghijklmnopqrstuvwxyz");
        assert_eq!(format!("{}", token), "gho_abcdef...");
        assert_eq!(format!("{:?}", token), "SessionToken(gho_abcdef...)");
        assert_eq!(token.expose(), "gho_abcdefghijklmnopqrstuvwxyz");
    }
}
