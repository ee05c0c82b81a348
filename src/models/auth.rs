// Bearer token claims carried through the admission pipeline

use serde::{Deserialize, Serialize};

/// Decoded access token claims
///
/// Immutable and request-scoped: decoded once by the token authenticator,
/// attached to the request context, dropped at response time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Role granted to the subject (attendee, organizer, admin, ...)
    pub role: String,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: u64,

    /// Expires at timestamp (Unix epoch seconds)
    pub exp: u64,

    /// Free-form payload the issuing side attached to the token
    #[serde(default)]
    pub data: serde_json::Value,
}

impl TokenClaims {
    pub fn new(
        subject: String,
        role: String,
        issued_at: u64,
        expires_at: u64,
        data: serde_json::Value,
    ) -> Self {
        Self {
            sub: subject,
            role,
            iat: issued_at,
            exp: expires_at,
            data,
        }
    }

    /// Check if the token is past its expiry claim
    pub fn is_expired(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.exp < now
    }
}
