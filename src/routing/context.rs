// Per-request context handed to business handlers

use axum::http::{HeaderMap, Method};
use std::collections::HashMap;

use crate::middleware::auth::AuthenticatedUser;

/// Everything a handler may need from the admission pipeline: the request
/// line, decoded body, path parameters and resolved identity. Owned by one
/// request's execution and dropped when the response goes out.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub params: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub claims: Option<AuthenticatedUser>,
}

impl RequestContext {
    pub fn new(method: Method, path: String, headers: HeaderMap) -> Self {
        Self {
            method,
            path,
            headers,
            params: HashMap::new(),
            body: None,
            claims: None,
        }
    }
}
