// Application configuration
// One immutable object assembled at startup and passed explicitly through
// AppState; components never reach for ambient globals.

use serde::{Deserialize, Serialize};

use crate::services::jwt::TokenSettings;
use crate::services::rate_limit::RateLimitSettings;

/// Cross-origin settings applied to every response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    pub allowed_headers: String,
    pub allowed_methods: String,
    pub max_age_seconds: u64,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_headers: "content-type, authorization, accept, origin, x-requested-with"
                .to_string(),
            allowed_methods: "GET, POST, PUT, PATCH, DELETE, OPTIONS".to_string(),
            max_age_seconds: 3600,
        }
    }
}

impl CorsSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
            allowed_headers: std::env::var("CORS_ALLOWED_HEADERS")
                .unwrap_or(defaults.allowed_headers),
            allowed_methods: std::env::var("CORS_ALLOWED_METHODS")
                .unwrap_or(defaults.allowed_methods),
            max_age_seconds: std::env::var("CORS_MAX_AGE_SECONDS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.max_age_seconds),
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

/// Physical backing for the rate limit store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitBackend {
    Memory,
    Redis { url: String },
}

/// Process-wide configuration, fixed after startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub bind_address: String,
    pub rate_limit: RateLimitSettings,
    pub rate_limit_backend: RateLimitBackend,
    pub sweep_interval_seconds: u64,
    pub token: TokenSettings,
    pub cors: CorsSettings,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let rate_limit_backend = match std::env::var("RATE_LIMIT_BACKEND").as_deref() {
            Ok("redis") => RateLimitBackend::Redis {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            },
            _ => RateLimitBackend::Memory,
        };

        Self {
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            rate_limit: RateLimitSettings::from_env(),
            rate_limit_backend,
            sweep_interval_seconds: std::env::var("RATE_LIMIT_SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(60),
            token: TokenSettings::from_env(),
            cors: CorsSettings::from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit.max_attempts == 0 {
            return Err("rate limit max_attempts cannot be zero".to_string());
        }
        if self.rate_limit.window_seconds == 0 {
            return Err("rate limit window_seconds cannot be zero".to_string());
        }
        if self.token.secret.is_empty() {
            return Err("token secret cannot be empty".to_string());
        }
        if self.is_production() && self.token.secret.len() < 32 {
            return Err("production token secret must be at least 32 bytes".to_string());
        }
        if self.cors.allowed_origins.is_empty() {
            return Err("at least one CORS origin must be configured".to_string());
        }
        Ok(())
    }
}
