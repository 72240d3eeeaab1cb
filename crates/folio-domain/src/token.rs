//! OAuth tokens for the remote file store

use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this long before their actual expiry
pub const EXPIRY_MARGIN_MS: i64 = 5 * 60 * 1000;

/// Access/refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Bearer token
    pub access_token: String,
    /// Token used to obtain a new access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as Unix milliseconds, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<i64>,
    /// Granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Token type (normally "Bearer")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl OAuthToken {
    /// Whether the token should be refreshed at `now_ms`
    ///
    /// A token without a known expiry is considered valid.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at_ms {
            Some(expires_at) => now_ms >= expires_at - EXPIRY_MARGIN_MS,
            None => false,
        }
    }
}
