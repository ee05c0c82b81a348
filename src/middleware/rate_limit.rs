// Rate limiting gate
// Resolves a stable per-client signature and asks the limiter for an
// admission decision before anything else downstream runs.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use tracing::warn;

use crate::app::AppState;
use crate::utils::errors::ApiError;

/// Derive the rate limit key for a request: a one-way hash of the resolved
/// client IP and the request path. Pure and total, no failure mode.
pub fn resolve_signature(headers: &HeaderMap, peer: Option<SocketAddr>, path: &str) -> String {
    let ip = resolve_client_ip(headers, peer);

    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(b"|");
    hasher.update(path.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Client IP preference order: first X-Forwarded-For entry, then X-Real-IP,
/// then the peer address, then the literal "unknown".
fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
    {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Admission middleware; rejections carry Retry-After and the budget header.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let signature = resolve_signature(req.headers(), peer, req.uri().path());

    let decision = state.rate_limit_service.check(&signature).await;
    if !decision.allowed {
        warn!(
            path = %req.uri().path(),
            attempts = decision.attempts,
            retry_after = decision.retry_after,
            "request rejected by rate limiter"
        );
        return ApiError::RateLimitExceeded {
            retry_after: decision.retry_after,
            limit: decision.limit,
        }
        .into_response();
    }

    next.run(req).await
}
