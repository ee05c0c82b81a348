// Fixed-window rate limiting service
//
// All mutation goes through the store's per-key compare-and-swap, so
// concurrent requests on one signature can never jointly exceed the attempt
// budget: each increment is built from an observed record and retried if
// another writer got there first.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::store::{CounterStore, RateWindowRecord, StoreError};

/// Fixed-window limiter settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitSettings {
    /// Maximum attempts per signature within one window
    pub max_attempts: u32,

    /// Window length in seconds
    pub window_seconds: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 60,
        }
    }
}

impl RateLimitSettings {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_attempts: std::env::var("RATE_LIMIT_MAX_ATTEMPTS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.max_attempts),
            window_seconds: std::env::var("RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.window_seconds),
        }
    }
}

/// Admission decision for one request
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,

    /// Attempts recorded in the window after this decision
    pub attempts: u32,

    /// Seconds until the window reopens; zero when allowed
    pub retry_after: u64,

    /// Configured attempt budget, echoed into response headers
    pub limit: u32,
}

/// Fixed-window rate limiter over a swappable counter store
pub struct RateLimitService {
    store: Arc<dyn CounterStore>,
    settings: RateLimitSettings,
}

impl RateLimitService {
    pub fn new(store: Arc<dyn CounterStore>, settings: RateLimitSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn decision_for(&self, record: Option<RateWindowRecord>, now: u64) -> RateLimitDecision {
        match record {
            Some(record) if !record.is_expired(now) => {
                if record.attempts < self.settings.max_attempts {
                    self.allowed(record.attempts)
                } else {
                    RateLimitDecision {
                        allowed: false,
                        attempts: record.attempts,
                        retry_after: record.expires_at.saturating_sub(now),
                        limit: self.settings.max_attempts,
                    }
                }
            },
            // no record, or a window that already closed
            _ => self.allowed(0),
        }
    }

    fn allowed(&self, attempts: u32) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            attempts,
            retry_after: 0,
            limit: self.settings.max_attempts,
        }
    }

    /// Store failures never turn into client-facing denials: the limiter
    /// lets the request through and leaves a trail in the logs.
    fn fail_open(&self, signature: &str, err: StoreError) -> RateLimitDecision {
        warn!(
            signature,
            error = %err,
            "rate limit store unavailable, failing open"
        );
        self.allowed(0)
    }

    /// Read-only admission check; does not consume an attempt
    pub async fn admit(&self, signature: &str) -> RateLimitDecision {
        let now = Self::now();
        match self.store.load(signature).await {
            Ok(record) => self.decision_for(record, now),
            Err(err) => self.fail_open(signature, err),
        }
    }

    /// Record one attempt for a signature previously admitted
    pub async fn hit(&self, signature: &str) {
        loop {
            let now = Self::now();
            let current = match self.store.load(signature).await {
                Ok(current) => current,
                Err(err) => {
                    self.fail_open(signature, err);
                    return;
                },
            };

            let next = match current {
                Some(record) if !record.is_expired(now) => record.incremented(),
                _ => RateWindowRecord::opened(now, self.settings.window_seconds),
            };

            match self.store.compare_and_swap(signature, current, next).await {
                Ok(true) => return,
                Ok(false) => continue, // lost the race, re-read
                Err(err) => {
                    self.fail_open(signature, err);
                    return;
                },
            }
        }
    }

    /// Combined admit-and-hit in one atomic step; the gate calls this so a
    /// burst of concurrent requests admits exactly `max_attempts`.
    pub async fn check(&self, signature: &str) -> RateLimitDecision {
        loop {
            let now = Self::now();
            let current = match self.store.load(signature).await {
                Ok(current) => current,
                Err(err) => return self.fail_open(signature, err),
            };

            let decision = self.decision_for(current, now);
            if !decision.allowed {
                return decision;
            }

            let next = match current {
                Some(record) if !record.is_expired(now) => record.incremented(),
                _ => RateWindowRecord::opened(now, self.settings.window_seconds),
            };

            match self.store.compare_and_swap(signature, current, next).await {
                Ok(true) => return self.allowed(next.attempts),
                Ok(false) => continue,
                Err(err) => return self.fail_open(signature, err),
            }
        }
    }

    /// Drop expired records from the store
    pub async fn sweep(&self) -> usize {
        match self.store.sweep(Self::now()).await {
            Ok(removed) => {
                if removed > 0 {
                    debug!(removed, "swept expired rate limit records");
                }
                removed
            },
            Err(err) => {
                warn!(error = %err, "rate limit sweep failed");
                0
            },
        }
    }

    /// Run sweep on an interval off the request path
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await; // first tick fires immediately, skip it
            loop {
                ticker.tick().await;
                service.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCounterStore;

    fn service(max_attempts: u32, window_seconds: u64) -> RateLimitService {
        RateLimitService::new(
            Arc::new(MemoryCounterStore::new()),
            RateLimitSettings {
                max_attempts,
                window_seconds,
            },
        )
    }

    #[test]
    fn test_default_settings() {
        let settings = RateLimitSettings::default();
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.window_seconds, 60);
    }

    #[tokio::test]
    async fn test_admit_does_not_consume_attempts() {
        let service = service(2, 60);

        for _ in 0..10 {
            assert!(service.admit("sig").await.allowed);
        }
        assert_eq!(service.check("sig").await.attempts, 1);
    }

    #[tokio::test]
    async fn test_check_exhausts_budget() {
        let service = service(3, 60);

        for expected in 1..=3 {
            let decision = service.check("sig").await;
            assert!(decision.allowed);
            assert_eq!(decision.attempts, expected);
        }

        let rejected = service.check("sig").await;
        assert!(!rejected.allowed);
        assert!(rejected.retry_after > 0);
        assert_eq!(rejected.limit, 3);

        // other signatures stay unaffected
        assert!(service.check("other").await.allowed);
    }

    #[tokio::test]
    async fn test_hit_opens_and_increments_window() {
        let service = service(5, 60);

        service.hit("sig").await;
        service.hit("sig").await;

        let decision = service.admit("sig").await;
        assert!(decision.allowed);
        assert_eq!(decision.attempts, 2);
    }
}
