// Shared fixtures for admission pipeline tests

use std::sync::Arc;

use tikit_backend_core::{
    app::AppState, AppConfig, CorsSettings, CounterStore, Dispatcher, HandlerGroup,
    MemoryCounterStore, RateLimitBackend, RateLimitService, RateLimitSettings, RouteTable,
    TokenService, TokenSettings,
};

pub const TEST_SECRET: &str = "test-admission-secret-hs256-minimum-32-chars";

pub fn test_config(max_attempts: u32, window_seconds: u64) -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        rate_limit: RateLimitSettings {
            max_attempts,
            window_seconds,
        },
        rate_limit_backend: RateLimitBackend::Memory,
        sweep_interval_seconds: 60,
        token: TokenSettings {
            secret: TEST_SECRET.to_string(),
            ..TokenSettings::default()
        },
        cors: CorsSettings::default(),
    }
}

pub struct TestApp {
    pub state: AppState,
    pub dispatcher: Arc<Dispatcher>,
    pub tokens: Arc<TokenService>,
}

/// Assemble an AppState around the given route table and handler groups,
/// backed by an in-memory rate limit store.
pub fn build_state(
    table: RouteTable,
    groups: Vec<HandlerGroup>,
    max_attempts: u32,
) -> TestApp {
    build_state_with_config(test_config(max_attempts, 60), table, groups)
}

/// Same assembly under a caller-supplied configuration.
pub fn build_state_with_config(
    config: AppConfig,
    table: RouteTable,
    groups: Vec<HandlerGroup>,
) -> TestApp {
    let config = Arc::new(config);
    let tokens = Arc::new(TokenService::new(config.token.clone()));
    let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
    let rate_limit_service = Arc::new(RateLimitService::new(store, config.rate_limit.clone()));
    let dispatcher = Arc::new(Dispatcher::new(table, groups, Arc::clone(&tokens)));

    let state = AppState {
        config,
        token_service: Arc::clone(&tokens),
        rate_limit_service,
        dispatcher: Arc::clone(&dispatcher),
    };

    TestApp {
        state,
        dispatcher,
        tokens,
    }
}
