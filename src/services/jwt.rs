// Bearer token authentication service
// HS256 by default, secret and algorithm fixed at startup; validation is
// pure in-memory work with no I/O past configuration load.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::models::auth::TokenClaims;

/// Authentication failures exposed by the gate
///
/// Decode failures deliberately collapse into one variant: callers (and
/// clients) cannot tell a forged signature from an expired or structurally
/// broken token, so validation internals never leak.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Authorization header must be 'Bearer <token>'")]
    MalformedHeader,

    #[error("Invalid or expired token")]
    InvalidOrExpired,
}

/// Token configuration loaded once at startup
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_seconds: u64,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: "dev-only-secret-change-me-before-deploying".to_string(),
            algorithm: Algorithm::HS256,
            ttl_seconds: 3600,
        }
    }
}

impl TokenSettings {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            secret: std::env::var("TOKEN_SECRET").unwrap_or(defaults.secret),
            algorithm: std::env::var("TOKEN_ALGORITHM")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.algorithm),
            ttl_seconds: std::env::var("TOKEN_TTL_SECONDS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.ttl_seconds),
        }
    }
}

/// Validates and issues bearer tokens
pub struct TokenService {
    algorithm: Algorithm,
    ttl_seconds: u64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(settings: TokenSettings) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.secret.as_bytes());

        let mut validation = Validation::new(settings.algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0; // no grace period past the expiry claim

        Self {
            algorithm: settings.algorithm,
            ttl_seconds: settings.ttl_seconds,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Pull the raw token out of an Authorization header value.
    ///
    /// The header must read exactly `Bearer <token>`: case-sensitive scheme,
    /// a single separating space, non-empty token.
    pub fn extract_token(header_value: &str) -> Result<&str, AuthError> {
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MalformedHeader)?;

        if token.is_empty() || token.contains(' ') {
            return Err(AuthError::MalformedHeader);
        }

        Ok(token)
    }

    /// Validate a full Authorization header value and return the claims
    pub fn validate_bearer(&self, header_value: &str) -> Result<TokenClaims, AuthError> {
        let token = Self::extract_token(header_value)?;
        self.decode_and_verify(token)
    }

    /// Verify signature, structure and expiry against the configured key
    fn decode_and_verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidOrExpired)
    }

    /// Issue a token for a subject, expiring after the configured TTL
    pub fn generate(
        &self,
        subject: &str,
        role: &str,
        data: serde_json::Value,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let claims = TokenClaims::new(
            subject.to_string(),
            role.to_string(),
            now,
            now + self.ttl_seconds,
            data,
        );

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
    }
}
