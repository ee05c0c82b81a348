// Two-level route dispatcher
//
// Level one: the prefix table decides which handler groups a request can
// touch, and their routes are registered idempotently on first use (tracked
// via a loaded set keyed by group id) instead of registering the whole route
// surface on every request. Level two: exact dispatch over the registered
// routes via a segment matcher with `{param}` captures.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::Method;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::middleware::auth::authorize;
use crate::services::jwt::TokenService;
use crate::utils::errors::ApiError;

use super::context::RequestContext;
use super::table::RouteTable;

/// Business handler invoked once admission completes
pub type RouteHandler = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Response> + Send + Sync>;

struct RouteDef {
    method: Method,
    pattern: String,
    requires_auth: bool,
    handler: RouteHandler,
}

/// The route registrations for one logical API area
pub struct HandlerGroup {
    id: String,
    routes: Vec<RouteDef>,
}

impl HandlerGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            routes: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register a public route
    pub fn route<H, Fut>(self, method: Method, pattern: &str, handler: H) -> Self
    where
        H: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Response> + Send + 'static,
    {
        self.push(method, pattern, false, handler)
    }

    /// Register a route guarded by the auth gate
    pub fn protected_route<H, Fut>(self, method: Method, pattern: &str, handler: H) -> Self
    where
        H: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Response> + Send + 'static,
    {
        self.push(method, pattern, true, handler)
    }

    fn push<H, Fut>(mut self, method: Method, pattern: &str, requires_auth: bool, handler: H) -> Self
    where
        H: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Response> + Send + 'static,
    {
        let handler: RouteHandler = Arc::new(move |ctx| Box::pin(handler(ctx)));
        self.routes.push(RouteDef {
            method,
            pattern: pattern.to_string(),
            requires_auth,
            handler,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

fn compile(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix(':') {
                Segment::Param(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            }
        })
        .collect()
}

fn match_path(segments: &[Segment], path: &str) -> Option<HashMap<String, String>> {
    let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    if parts.len() != segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (segment, part) in segments.iter().zip(parts) {
        match segment {
            Segment::Literal(literal) => {
                if literal != part {
                    return None;
                }
            },
            Segment::Param(name) => {
                params.insert(name.clone(), part.to_string());
            },
        }
    }
    Some(params)
}

struct CompiledRoute {
    method: Method,
    segments: Vec<Segment>,
    requires_auth: bool,
    handler: RouteHandler,
}

#[derive(Default)]
struct DispatchState {
    loaded: HashSet<String>,
    routes: Vec<CompiledRoute>,
}

/// Maps request paths onto handler groups and dispatches into them
pub struct Dispatcher {
    table: RouteTable,
    groups: HashMap<String, HandlerGroup>,
    group_order: Vec<String>,
    tokens: Arc<TokenService>,
    inner: RwLock<DispatchState>,
}

impl Dispatcher {
    pub fn new(table: RouteTable, groups: Vec<HandlerGroup>, tokens: Arc<TokenService>) -> Self {
        let group_order = groups.iter().map(|group| group.id.clone()).collect();
        let groups = groups
            .into_iter()
            .map(|group| (group.id.clone(), group))
            .collect();

        Self {
            table,
            groups,
            group_order,
            tokens,
            inner: RwLock::new(DispatchState::default()),
        }
    }

    /// Group ids whose routes are currently registered
    pub async fn loaded_groups(&self) -> HashSet<String> {
        self.inner.read().await.loaded.clone()
    }

    async fn ensure_loaded(&self, group_ids: &[String]) {
        {
            let inner = self.inner.read().await;
            if group_ids.iter().all(|id| inner.loaded.contains(id)) {
                return;
            }
        }

        let mut inner = self.inner.write().await;
        for id in group_ids {
            // re-checked under the write lock: another request may have
            // registered the group while we waited
            if inner.loaded.contains(id) {
                continue;
            }
            let Some(group) = self.groups.get(id) else {
                // still marked loaded, or every request under this prefix
                // would take the write lock again
                warn!(group = %id, "route table names an unregistered handler group");
                inner.loaded.insert(id.clone());
                continue;
            };

            for route in &group.routes {
                inner.routes.push(CompiledRoute {
                    method: route.method.clone(),
                    segments: compile(&route.pattern),
                    requires_auth: route.requires_auth,
                    handler: Arc::clone(&route.handler),
                });
            }
            inner.loaded.insert(id.clone());
            debug!(group = %id, routes = group.routes.len(), "handler group loaded");
        }
    }

    pub async fn dispatch(&self, mut ctx: RequestContext) -> Response {
        let matching: Vec<String> = self
            .table
            .matching_groups(&ctx.path)
            .into_iter()
            .map(String::from)
            .collect();

        // no prefix matched: register everything so the catch-all 404
        // surface is guaranteed to exist
        let to_load = if matching.is_empty() {
            self.group_order.clone()
        } else {
            matching
        };
        self.ensure_loaded(&to_load).await;

        let matched = {
            let inner = self.inner.read().await;
            inner.routes.iter().find_map(|route| {
                if route.method != ctx.method {
                    return None;
                }
                match_path(&route.segments, &ctx.path).map(|params| {
                    (Arc::clone(&route.handler), params, route.requires_auth)
                })
            })
        };

        let Some((handler, params, requires_auth)) = matched else {
            return ApiError::RouteNotFound.into_response();
        };

        if requires_auth {
            match authorize(&ctx.headers, &self.tokens) {
                Ok(user) => ctx.claims = Some(user),
                Err(err) => return err.into_response(),
            }
        }

        ctx.params = params;
        handler(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::jwt::TokenSettings;
    use axum::http::{HeaderMap, StatusCode};

    #[test]
    fn test_compile_and_match_with_params() {
        let segments = compile("/v1/events/{event_id}/tickets/{id}");
        let params = match_path(&segments, "/v1/events/42/tickets/7").expect("should match");
        assert_eq!(params["event_id"], "42");
        assert_eq!(params["id"], "7");

        assert!(match_path(&segments, "/v1/events/42/tickets").is_none());
        assert!(match_path(&segments, "/v1/events/42/orders/7").is_none());
    }

    #[test]
    fn test_literal_segments_must_match_exactly() {
        let segments = compile("/v1/events");
        assert!(match_path(&segments, "/v1/events").is_some());
        assert!(match_path(&segments, "/v1/Events").is_none());
        assert!(match_path(&segments, "/v1/events/").is_some()); // trailing slash collapses
    }

    #[tokio::test]
    async fn test_unregistered_group_id_still_registers_as_loaded() {
        let table = RouteTable::default().with_entry("/v1/ghost", "ghost");
        let dispatcher = Dispatcher::new(
            table,
            Vec::new(),
            Arc::new(TokenService::new(TokenSettings::default())),
        );

        let ctx = RequestContext::new(Method::GET, "/v1/ghost/1".to_string(), HeaderMap::new());
        let response = dispatcher.dispatch(ctx).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // the loaded set must record the id so later requests stay on the
        // read-lock fast path
        assert!(dispatcher.loaded_groups().await.contains("ghost"));
    }
}
