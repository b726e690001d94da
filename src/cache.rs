use std::collections::HashMap;
use std::time::{Duration, Instant};

/// In-memory cache with pure time-based expiry.
///
/// Each service wrapper owns its own instance with a TTL chosen at
/// construction; there is no shared module-level cache. Writes are
/// last-write-wins and expired entries are dropped lazily on read.
pub struct TtlCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    ttl: Duration,
}

struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<T> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };

        if expired {
            self.entries.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop all expired entries eagerly.
    pub fn prune(&mut self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
