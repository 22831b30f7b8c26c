//! Query cache with coarse TTL freshness and invalidation watchers.
//!
//! Values are cached as canonical JSON so the cache stays oblivious to
//! entity types. Watchers are plain callbacks run synchronously, in
//! registration order, by whoever invalidates; they are invoked with no
//! internal lock held, so a callback may call back into the cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use radar_shared::EntityId;

/// Identity of a cacheable query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Conversations,
    Messages(EntityId),
    Notifications,
    ConnectionRequests,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversations => f.write_str("conversations"),
            Self::Messages(id) => write!(f, "messages:{id}"),
            Self::Notifications => f.write_str("notifications"),
            Self::ConnectionRequests => f.write_str("connection-requests"),
        }
    }
}

type WatchCallback = Arc<dyn Fn() + Send + Sync>;

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<QueryKey, CacheEntry>,
    watchers: HashMap<QueryKey, Vec<(u64, WatchCallback)>>,
    next_watch_id: u64,
}

/// Shared cache handle. Clones share storage and watchers.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<CacheInner>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a value under `key`, resetting its freshness window.
    pub fn put(&self, key: QueryKey, value: Value) {
        debug!(key = %key, "Query result cached");
        self.lock().entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Fetch a fresh value. Stale entries are evicted on the way out.
    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        let mut inner = self.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => return None,
        }
        inner.entries.remove(key);
        debug!(key = %key, "Stale entry evicted");
        None
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.stored_at.elapsed() < self.ttl)
    }

    /// Register a callback to run whenever `key` is invalidated. The
    /// registration lives as long as the returned handle.
    pub fn watch(&self, key: QueryKey, callback: impl Fn() + Send + Sync + 'static) -> WatchHandle {
        let mut inner = self.lock();
        let id = inner.next_watch_id;
        inner.next_watch_id += 1;
        inner
            .watchers
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        WatchHandle {
            key,
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Drop the cached value for `key` and notify its watchers, in
    /// registration order.
    pub fn invalidate(&self, key: &QueryKey) {
        let callbacks: Vec<WatchCallback> = {
            let mut inner = self.lock();
            inner.entries.remove(key);
            inner
                .watchers
                .get(key)
                .map(|list| list.iter().map(|(_, callback)| callback.clone()).collect())
                .unwrap_or_default()
        };
        debug!(key = %key, watchers = callbacks.len(), "Query invalidated");
        for callback in &callbacks {
            callback();
        }
    }

    /// Drop every cached value and notify every watcher.
    pub fn invalidate_all(&self) {
        let callbacks: Vec<WatchCallback> = {
            let mut inner = self.lock();
            inner.entries.clear();
            inner
                .watchers
                .values()
                .flat_map(|list| list.iter().map(|(_, callback)| callback.clone()))
                .collect()
        };
        debug!(watchers = callbacks.len(), "All queries invalidated");
        for callback in &callbacks {
            callback();
        }
    }

    /// Proactively drop entries past their TTL.
    pub fn evict_stale(&self) {
        let ttl = self.ttl;
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        let evicted = before - inner.entries.len();
        if evicted > 0 {
            debug!(evicted, "Stale entries evicted");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

/// Live watcher registration. Dropping the handle unregisters the
/// callback; a handle outliving the cache is harmless.
pub struct WatchHandle {
    key: QueryKey,
    id: u64,
    inner: Weak<Mutex<CacheInner>>,
}

impl WatchHandle {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = inner.watchers.get_mut(&self.key) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                inner.watchers.remove(&self.key);
            }
        }
    }
}
