// Cross-origin responder
// Stateless and configuration-driven: every response gets the full CORS
// header set plus forced no-cache headers, and OPTIONS preflights are
// answered here without ever reaching the dispatcher.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::app::AppState;
use crate::app_config::CorsSettings;

pub async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let cors = &state.config.cors;

    let request_origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    let grant = resolve_grant(cors, request_origin.as_deref());

    if req.method() == Method::OPTIONS {
        debug!(path = %req.uri().path(), "answering preflight");
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(&mut response, cors, grant.as_ref());
        return response;
    }

    let mut response = next.run(req).await;
    apply_cors_headers(&mut response, cors, grant.as_ref());
    response
}

/// Origin grant for a request, if any.
///
/// A wildcard configuration grants `*` without credentials. A pinned
/// configuration reflects the request origin with credentials, and only when
/// that origin is whitelisted; otherwise no grant is emitted at all.
fn resolve_grant(
    cors: &CorsSettings,
    request_origin: Option<&str>,
) -> Option<(String, &'static str)> {
    if cors.allows_any_origin() {
        return Some(("*".to_string(), "false"));
    }

    let origin = request_origin?;
    cors.allowed_origins
        .iter()
        .any(|allowed| allowed == origin)
        .then(|| (origin.to_string(), "true"))
}

fn apply_cors_headers(
    response: &mut Response,
    cors: &CorsSettings,
    grant: Option<&(String, &'static str)>,
) {
    let headers = response.headers_mut();

    if let Some((allow_origin, allow_credentials)) = grant {
        if let Ok(value) = HeaderValue::from_str(allow_origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static(*allow_credentials),
        );
    }
    if let Ok(value) = HeaderValue::from_str(&cors.allowed_headers) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
    }
    if let Ok(value) = HeaderValue::from_str(&cors.allowed_methods) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    if let Ok(value) = HeaderValue::from_str(&cors.max_age_seconds.to_string()) {
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, value);
    }

    // admission responses must never be cached by intermediaries
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
}
