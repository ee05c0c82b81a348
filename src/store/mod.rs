// Rate limit counter storage
//
// The limiter never does naive read-modify-write against its backend. The
// contract here is a keyed compare-and-swap: callers read a record, compute
// the successor, and swap only if the stored value is unchanged. Backends
// must make that swap atomic per key.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::memory::MemoryCounterStore;
pub use self::redis::RedisCounterStore;

/// One fixed-window counter: created on the first hit of a window,
/// incremented until the window closes, replaced once `now > expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindowRecord {
    /// Attempts recorded in the current window
    pub attempts: u32,

    /// Window close time (Unix epoch seconds)
    pub expires_at: u64,
}

impl RateWindowRecord {
    /// Fresh window opened by the current request
    pub fn opened(now: u64, window_seconds: u64) -> Self {
        Self {
            attempts: 1,
            expires_at: now + window_seconds,
        }
    }

    /// A record is expired strictly after its close time passes
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at < now
    }

    /// Successor record with one more attempt, same window
    pub fn incremented(&self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Store backend unavailable: {0}")]
    Unavailable(String),
}

/// Keyed counter store with a per-key atomic compare-and-swap contract
///
/// Backends are swappable: an in-memory map for single-instance deployments,
/// Redis when limits must hold across instances.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current record for a key, if any
    async fn load(&self, key: &str) -> Result<Option<RateWindowRecord>, StoreError>;

    /// Store `next` only if the key still holds `current` (`None` = absent).
    /// Returns whether the swap was applied. Must be atomic per key.
    async fn compare_and_swap(
        &self,
        key: &str,
        current: Option<RateWindowRecord>,
        next: RateWindowRecord,
    ) -> Result<bool, StoreError>;

    /// Drop expired records; bounds storage, never required for correctness.
    /// Safe to run concurrently with load/compare_and_swap.
    async fn sweep(&self, now: u64) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lifecycle() {
        let record = RateWindowRecord::opened(100, 60);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.expires_at, 160);

        assert!(!record.is_expired(160)); // boundary second still counts
        assert!(record.is_expired(161));

        let next = record.incremented();
        assert_eq!(next.attempts, 2);
        assert_eq!(next.expires_at, record.expires_at);
    }
}
