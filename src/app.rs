// Application state shared across the pipeline
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    routing::Dispatcher,
    services::{RateLimitService, TokenService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub token_service: Arc<TokenService>,
    pub rate_limit_service: Arc<RateLimitService>,
    pub dispatcher: Arc<Dispatcher>,
}
