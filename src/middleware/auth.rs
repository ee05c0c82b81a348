// Auth gate for protected routes
// Validates the bearer token and produces the identity attached to the
// request context; no request with unresolved claims reaches a handler.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::models::auth::TokenClaims;
use crate::services::jwt::TokenService;
use crate::utils::errors::ApiError;

/// Authenticated identity extracted from a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub role: String,
    pub issued_at: u64,
    pub expires_at: u64,
    pub data: serde_json::Value,
}

impl From<TokenClaims> for AuthenticatedUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub,
            role: claims.role,
            issued_at: claims.iat,
            expires_at: claims.exp,
            data: claims.data,
        }
    }
}

/// Admit or deny a request based on its Authorization header.
///
/// A missing header is reported separately from a malformed one, but both
/// surface to the client as a uniform 401.
pub fn authorize(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<AuthenticatedUser, ApiError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::MissingAuthHeader)?;

    let claims = tokens.validate_bearer(header_value)?;
    Ok(AuthenticatedUser::from(claims))
}
