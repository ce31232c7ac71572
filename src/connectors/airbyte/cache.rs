//! In-memory TTL set of dispatched container runs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How long a dispatched run is remembered
pub const RUN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
pub struct RunCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Instant>>,
}

impl Default for RunCache {
    fn default() -> Self {
        Self::new(RUN_TTL)
    }
}

impl RunCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        // Entries are plain timestamps, a poisoned map is still consistent
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Whether `key` was set less than a TTL ago
    pub fn contains(&self, key: &str) -> bool {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(at) if at.elapsed() < self.ttl => true,
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        }
    }

    pub fn insert(&self, key: impl Into<String>) {
        self.lock().insert(key.into(), Instant::now());
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
