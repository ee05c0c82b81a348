// Pipeline composer
// Orders the admission stages into one execution chain. Request-flow order:
// error boundary, logging, rate limiting, CORS, body decoding, dispatch,
// then the per-route auth gate inside the dispatcher.

use std::any::Any;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use crate::app::AppState;
use crate::middleware::body_decoder::{json_body_middleware, DecodedBody};
use crate::middleware::cors::cors_middleware;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::routing::RequestContext;
use crate::utils::errors;

/// Build the admission router around the dispatcher.
///
/// Axum applies layers inside out, so they are attached in reverse of the
/// request-flow order listed above.
pub fn build_router(state: AppState) -> Router {
    let expose_detail = !state.config.is_production();

    Router::new()
        .fallback(dispatch_handler)
        .layer(from_fn(json_body_middleware))
        .layer(from_fn_with_state(state.clone(), cors_middleware))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| {
                let detail = panic_message(panic);
                error!(detail = %detail, "request processing panicked");
                errors::internal_response(expose_detail.then_some(detail.as_str()))
            },
        ))
        .with_state(state)
}

fn panic_message(panic: Box<dyn Any + Send + 'static>) -> String {
    if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Terminal stage: every admitted request funnels into the dispatcher.
async fn dispatch_handler(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (mut parts, _body) = req.into_parts();

    let mut ctx = RequestContext::new(
        parts.method.clone(),
        parts.uri.path().to_string(),
        parts.headers.clone(),
    );
    if let Some(DecodedBody(value)) = parts.extensions.remove::<DecodedBody>() {
        ctx.body = Some(value);
    }

    state.dispatcher.dispatch(ctx).await
}
