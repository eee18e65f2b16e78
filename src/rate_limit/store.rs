use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Hits recorded in the current window of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    pub reset_after: Duration,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis counter store failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Fixed-window hit counters keyed by policy and client.
#[rocket::async_trait]
pub trait CounterStore: Send + Sync {
    /// Records one hit on `key` and returns the window's running total.
    async fn hit(&self, key: &str, length: Duration) -> Result<WindowCount, StoreError>;
}

#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    resets_at: Instant,
    count: u64,
}

const PRUNE_EVERY: u64 = 1024;

/// In-process counters. Expired windows are dropped periodically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: DashMap<String, FixedWindow>,
    hits: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn hit_at(&self, key: &str, length: Duration, now: Instant) -> WindowCount {
        let result = {
            let mut window = self.windows.entry(key.to_string()).or_insert(FixedWindow {
                resets_at: now + length,
                count: 0,
            });

            if window.resets_at <= now {
                window.resets_at = now + length;
                window.count = 0;
            }
            window.count += 1;

            WindowCount {
                count: window.count,
                reset_after: window.resets_at.saturating_duration_since(now),
            }
        };

        // The entry guard must be gone before retain takes every shard lock.
        if self.hits.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune(now);
        }

        result
    }

    pub fn prune(&self, now: Instant) {
        let before = self.windows.len();
        self.windows.retain(|_, window| window.resets_at > now);
        debug!(dropped = before.saturating_sub(self.windows.len()), "pruned expired rate limit windows");
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[rocket::async_trait]
impl CounterStore for MemoryStore {
    async fn hit(&self, key: &str, length: Duration) -> Result<WindowCount, StoreError> {
        Ok(self.hit_at(key, length, Instant::now()))
    }
}

/// Uses the shared store when there is one and falls back to in-process
/// counters whenever it fails.
pub struct FallbackStore {
    primary: Option<Box<dyn CounterStore>>,
    memory: MemoryStore,
}

impl FallbackStore {
    pub fn new(primary: Option<Box<dyn CounterStore>>) -> FallbackStore {
        FallbackStore {
            primary,
            memory: MemoryStore::new(),
        }
    }

    pub fn memory_only() -> FallbackStore {
        FallbackStore::new(None)
    }
}

#[rocket::async_trait]
impl CounterStore for FallbackStore {
    async fn hit(&self, key: &str, length: Duration) -> Result<WindowCount, StoreError> {
        if let Some(primary) = &self.primary {
            match primary.hit(key, length).await {
                Ok(count) => return Ok(count),
                Err(e) => warn!(error = %e, "shared rate limit store failed, counting in process"),
            }
        }

        self.memory.hit(key, length).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::{ErrorKind, RedisError};

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn counts_within_a_window_and_resets_after_it() {
        let store = MemoryStore::new();
        let start = Instant::now();

        assert_eq!(store.hit_at("general:1.2.3.4", MINUTE, start).count, 1);
        let second = store.hit_at("general:1.2.3.4", MINUTE, start + Duration::from_secs(20));
        assert_eq!(second.count, 2);
        assert_eq!(second.reset_after, Duration::from_secs(40));

        let fresh = store.hit_at("general:1.2.3.4", MINUTE, start + MINUTE);
        assert_eq!(fresh.count, 1);
        assert_eq!(fresh.reset_after, MINUTE);
    }

    #[test]
    fn keys_are_counted_independently() {
        let store = MemoryStore::new();
        let now = Instant::now();

        store.hit_at("general:a", MINUTE, now);
        store.hit_at("general:a", MINUTE, now);
        assert_eq!(store.hit_at("general:b", MINUTE, now).count, 1);
        assert_eq!(store.hit_at("search:a", MINUTE, now).count, 1);
    }

    #[test]
    fn prune_drops_only_expired_windows() {
        let store = MemoryStore::new();
        let now = Instant::now();

        store.hit_at("short", Duration::from_secs(1), now);
        store.hit_at("long", MINUTE, now);
        store.prune(now + Duration::from_secs(2));

        assert_eq!(store.len(), 1);
        assert_eq!(store.hit_at("long", MINUTE, now).count, 2);
    }

    struct Unreachable;

    #[rocket::async_trait]
    impl CounterStore for Unreachable {
        async fn hit(&self, _key: &str, _length: Duration) -> Result<WindowCount, StoreError> {
            Err(RedisError::from((ErrorKind::IoError, "connection refused")).into())
        }
    }

    #[rocket::async_test]
    async fn failing_primary_falls_back_to_memory() {
        let store = FallbackStore::new(Some(Box::new(Unreachable)));

        assert_eq!(store.hit("general:x", MINUTE).await.unwrap().count, 1);
        assert_eq!(store.hit("general:x", MINUTE).await.unwrap().count, 2);
    }

    #[rocket::async_test]
    async fn memory_only_store_counts() {
        let store = FallbackStore::memory_only();
        assert_eq!(store.hit("search:x", MINUTE).await.unwrap().count, 1);
    }
}
