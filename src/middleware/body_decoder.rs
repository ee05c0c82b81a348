// JSON body decoder
// Parses request bodies once, up front, so handlers work with a decoded
// structure and never touch raw bytes. Non-JSON content passes through.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::utils::errors::ApiError;

/// Parsed JSON payload attached to the request
#[derive(Debug, Clone)]
pub struct DecodedBody(pub serde_json::Value);

const MAX_JSON_BODY_BYTES: usize = 1024 * 1024;

fn is_json_content_type(req: &Request<Body>) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|content_type| {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            essence == "application/json" || essence.ends_with("+json")
        })
        .unwrap_or(false)
}

pub async fn json_body_middleware(req: Request<Body>, next: Next) -> Response {
    if !is_json_content_type(&req) {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();

    let bytes = match to_bytes(body, MAX_JSON_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => return ApiError::InvalidJson(err.to_string()).into_response(),
    };

    // covers both zero-length and whitespace-only bodies
    if bytes.iter().all(|byte| byte.is_ascii_whitespace()) {
        return ApiError::EmptyBody.into_response();
    }

    let value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => return ApiError::InvalidJson(err.to_string()).into_response(),
    };

    parts.extensions.insert(DecodedBody(value));
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
