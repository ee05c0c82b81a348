// In-memory counter store
//
// DashMap's entry API holds the key's shard lock for the whole
// compare-and-swap, which is exactly the per-key atomicity the trait asks for.

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use super::{CounterStore, RateWindowRecord, StoreError};

/// Process-local counter store for single-instance deployments and tests
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    records: DashMap<String, RateWindowRecord>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records (expired ones included until swept)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn load(&self, key: &str) -> Result<Option<RateWindowRecord>, StoreError> {
        Ok(self.records.get(key).map(|entry| *entry.value()))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        current: Option<RateWindowRecord>,
        next: RateWindowRecord,
    ) -> Result<bool, StoreError> {
        let applied = match self.records.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if current == Some(*occupied.get()) {
                    occupied.insert(next);
                    true
                } else {
                    false
                }
            },
            Entry::Vacant(vacant) => {
                if current.is_none() {
                    vacant.insert(next);
                    true
                } else {
                    false
                }
            },
        };

        Ok(applied)
    }

    async fn sweep(&self, now: u64) -> Result<usize, StoreError> {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        Ok(before.saturating_sub(self.records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cas_against_absent_key() {
        let store = MemoryCounterStore::new();
        let record = RateWindowRecord::opened(100, 60);

        assert!(store.compare_and_swap("k", None, record).await.unwrap());
        assert_eq!(store.load("k").await.unwrap(), Some(record));

        // stale expectation loses
        assert!(!store.compare_and_swap("k", None, record).await.unwrap());
    }

    #[tokio::test]
    async fn test_cas_detects_stale_record() {
        let store = MemoryCounterStore::new();
        let first = RateWindowRecord::opened(100, 60);
        store.compare_and_swap("k", None, first).await.unwrap();

        let bumped = first.incremented();
        assert!(store
            .compare_and_swap("k", Some(first), bumped)
            .await
            .unwrap());
        assert!(!store
            .compare_and_swap("k", Some(first), bumped.incremented())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_sweep_drops_only_expired() {
        let store = MemoryCounterStore::new();
        store
            .compare_and_swap("old", None, RateWindowRecord::opened(0, 10))
            .await
            .unwrap();
        store
            .compare_and_swap("live", None, RateWindowRecord::opened(100, 60))
            .await
            .unwrap();

        let removed = store.sweep(100).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.load("old").await.unwrap().is_none());
        assert!(store.load("live").await.unwrap().is_some());
    }
}
