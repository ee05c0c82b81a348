// Terminal request errors for the admission pipeline
// Every stage signals failure as a value; conversion to HTTP happens here,
// at the outermost boundary, and nowhere else.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::jwt::AuthError;

/// Errors that terminate a request before it reaches a business handler
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Too many requests, slow down")]
    RateLimitExceeded { retry_after: u64, limit: u32 },

    #[error("Authorization header is missing")]
    MissingAuthHeader,

    #[error("Authorization header must be 'Bearer <token>'")]
    MalformedAuthHeader,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Request body is empty")]
    EmptyBody,

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Route not found")]
    RouteNotFound,

    /// Never surfaced to clients; the rate limiting gate fails open instead.
    #[error("Rate limit store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

/// Wire format for every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::MissingAuthHeader => StatusCode::UNAUTHORIZED,
            ApiError::MalformedAuthHeader => StatusCode::UNAUTHORIZED,
            ApiError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            ApiError::EmptyBody => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::MissingAuthHeader => "MISSING_AUTH_HEADER",
            ApiError::MalformedAuthHeader => "MALFORMED_AUTH_HEADER",
            ApiError::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            ApiError::EmptyBody => "EMPTY_BODY",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::RouteNotFound => "ROUTE_NOT_FOUND",
            ApiError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimitExceeded { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingHeader => ApiError::MissingAuthHeader,
            AuthError::MalformedHeader => ApiError::MalformedAuthHeader,
            AuthError::InvalidOrExpired => ApiError::InvalidOrExpiredToken,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal detail stays in the logs, not on the wire
        let message = match &self {
            ApiError::StoreUnavailable(_) | ApiError::Internal(_) => {
                "Internal server error".to_string()
            },
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: self.error_code().to_string(),
            message,
            status: status.as_u16(),
            retry_after: self.retry_after(),
        };

        let mut response = (status, Json(body)).into_response();

        if let ApiError::RateLimitExceeded { retry_after, limit } = &self {
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                headers.insert("Retry-After", value);
            }
            if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert("X-RateLimit-Limit", value);
            }
        }

        response
    }
}

/// Generic 500 used by the panic boundary; detail is attached only when the
/// deployment is allowed to expose it (development/staging).
pub fn internal_response(detail: Option<&str>) -> Response {
    let body = ErrorBody {
        error: "INTERNAL_ERROR".to_string(),
        message: detail.unwrap_or("Internal server error").to_string(),
        status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        retry_after: None,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
