use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::response::{IntoResponse, Json};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tikit_backend_core::{
    app::AppState, app_config::RateLimitBackend, build_router, AppConfig, CounterStore,
    Dispatcher, HandlerGroup, MemoryCounterStore, RateLimitService, RedisCounterStore,
    RouteTable, TokenService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tikit_backend_core=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = Arc::new(AppConfig::from_env());
    config
        .validate()
        .map_err(|e| format!("invalid configuration: {}", e))?;

    info!(
        environment = %config.environment,
        "Starting tikit admission layer on {}",
        config.bind_address
    );

    let store: Arc<dyn CounterStore> = match &config.rate_limit_backend {
        RateLimitBackend::Memory => Arc::new(MemoryCounterStore::new()),
        RateLimitBackend::Redis { url } => {
            info!("Connecting rate limit store to Redis...");
            Arc::new(RedisCounterStore::connect(url).await?)
        },
    };

    let rate_limit_service = Arc::new(RateLimitService::new(store, config.rate_limit.clone()));
    let _sweeper =
        rate_limit_service.spawn_sweeper(Duration::from_secs(config.sweep_interval_seconds));

    let token_service = Arc::new(TokenService::new(config.token.clone()));

    // Business handler groups are wired in by the hosting service; the
    // binary itself only serves the health surface.
    let health = HandlerGroup::new("health").route(Method::GET, "/health", |_ctx| async move {
        Json(serde_json::json!({
            "status": "healthy",
            "service": "tikit-backend-core",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
        .into_response()
    });

    let table = RouteTable::default().with_entry("/health", "health");
    let dispatcher = Arc::new(Dispatcher::new(
        table,
        vec![health],
        Arc::clone(&token_service),
    ));

    let state = AppState {
        config: Arc::clone(&config),
        token_service,
        rate_limit_service,
        dispatcher,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
