// Library exports for the tikit admission layer
// This file exposes modules and types for library consumers

pub mod app;
pub mod app_config;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod routing;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CorsSettings, RateLimitBackend};
pub use middleware::auth::{authorize, AuthenticatedUser};
pub use middleware::body_decoder::DecodedBody;
pub use models::auth::TokenClaims;
pub use pipeline::build_router;
pub use routing::{Dispatcher, HandlerGroup, RequestContext, RouteEntry, RouteHandler, RouteTable};
pub use services::{
    AuthError, RateLimitDecision, RateLimitService, RateLimitSettings, TokenService, TokenSettings,
};
pub use store::{CounterStore, MemoryCounterStore, RateWindowRecord, RedisCounterStore, StoreError};
pub use utils::errors::{ApiError, ErrorBody};
