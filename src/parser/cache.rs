use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use log::debug;

use crate::models::ProxyNode;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_SWEEP_THRESHOLD: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry {
    node: ProxyNode,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

/// Time-bounded memo of `raw link -> parsed node`.
///
/// Expired entries read as misses. They are dropped opportunistically on
/// lookup, and all at once when an insert pushes the table past the sweep
/// threshold. A poisoned lock is recovered rather than propagated since the
/// cache holds no invariant a panic could break.
#[derive(Debug)]
pub struct ParseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    sweep_threshold: usize,
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_SWEEP_THRESHOLD)
    }
}

impl ParseCache {
    pub fn new(ttl: Duration, sweep_threshold: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            sweep_threshold,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, link: &str) -> Option<ProxyNode> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(link) {
                Some(entry) if !entry.is_expired(self.ttl, now) => return Some(entry.node.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: remove it if nobody else holds the lock, otherwise leave
        // it for the next sweep.
        if let Ok(mut entries) = self.entries.try_write() {
            if entries
                .get(link)
                .is_some_and(|entry| entry.is_expired(self.ttl, now))
            {
                entries.remove(link);
            }
        }
        None
    }

    pub fn set(&self, link: impl Into<String>, node: ProxyNode) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            link.into(),
            CacheEntry {
                node,
                inserted_at: Instant::now(),
            },
        );

        if entries.len() > self.sweep_threshold {
            let now = Instant::now();
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
            debug!(
                "Parse cache sweep removed {} expired entries",
                before - entries.len()
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
