use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use ucsb_client::{ApiError, Request, Transport};

use crate::value::{CacheValue, SubscriptionId};

/// Callback type for cache change notifications.
pub type ChangeHandler = Arc<dyn Fn(&str, &CacheEvent) + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, Result<CacheValue, ApiError>>>;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Success,
    Error,
}

/// The last known state of one cache key.
///
/// `value` survives failed refreshes; only a successful fetch replaces it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Option<CacheValue>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub status: EntryStatus,
    /// Set by `invalidate`. Cleared by `set`, or by a fetch that started
    /// after the last invalidation.
    pub stale: bool,
    /// Failure of the most recent fetch, if it failed.
    pub error: Option<ApiError>,
    /// Bumped by every `invalidate`.
    generation: u64,
}

impl CacheEntry {
    fn pending() -> Self {
        Self {
            value: None,
            fetched_at: None,
            status: EntryStatus::Pending,
            stale: false,
            error: None,
            generation: 0,
        }
    }

    /// Whether a reader should issue a fetch for this entry.
    pub fn needs_fetch(&self) -> bool {
        self.stale || self.status == EntryStatus::Error
    }
}

/// What changed about an entry, delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// A fetch started.
    Loading,
    /// A fresh value was stored.
    Updated,
    /// The entry was marked stale.
    Invalidated,
    /// A fetch failed; the previous value, if any, is kept.
    Failed(ApiError),
}

#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    handler: ChangeHandler,
}

/// Keyed response cache shared by every fetch and mutation binding.
///
/// - `get(key)` returns the current entry; values are `Arc` snapshots.
/// - `set(key, value)` stores a fresh value and notifies subscribers.
/// - `invalidate(key)` marks the entry stale and notifies subscribers.
/// - `subscribe(key, handler)` registers a change handler.
/// - `fetch(transport, request)` loads a key with at most one request in
///   flight per key.
///
/// Construct one per process and pass it around as `Arc<CacheStore>`.
/// Handlers run synchronously on the calling thread, after every lock has
/// been released, so a handler may call back into the store.
pub struct CacheStore {
    entries: RwLock<BTreeMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, SharedFetch>>,
    handlers: RwLock<HashMap<String, Vec<HandlerEntry>>>,
    next_id: AtomicU64,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            inflight: Mutex::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    // ====================================================================
    // Entries
    // ====================================================================

    /// Current entry for `key`. The value inside is shared, not copied.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        read(&self.entries).get(key).cloned()
    }

    /// Store a fresh value and notify subscribers.
    pub fn set(&self, key: &str, value: Value) -> CacheValue {
        let value = CacheValue::new(value);
        self.record(key, Ok(value.clone()), None);
        self.notify(key, &CacheEvent::Updated);
        value
    }

    /// Record a failed fetch. The previous value is retained.
    pub fn set_error(&self, key: &str, error: ApiError) {
        self.record(key, Err(error.clone()), None);
        self.notify(key, &CacheEvent::Failed(error));
    }

    /// `started` is the entry generation a fetch began at. When an
    /// invalidation landed since then the result is stored but the entry
    /// stays stale.
    fn record(&self, key: &str, result: Result<CacheValue, ApiError>, started: Option<u64>) {
        let mut entries = write(&self.entries);
        let entry = entries.entry(key.to_string()).or_insert_with(CacheEntry::pending);
        entry.stale = started.is_some_and(|generation| generation != entry.generation);
        match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.fetched_at = Some(Utc::now());
                entry.status = EntryStatus::Success;
                entry.error = None;
            }
            Err(error) => {
                entry.status = EntryStatus::Error;
                entry.error = Some(error);
            }
        }
    }

    /// Mark `key` stale and notify its subscribers.
    ///
    /// Only the transition to stale notifies: invalidating a key that is
    /// already stale, or was never loaded, sends nothing. Returns whether
    /// the entry changed.
    ///
    /// A fetch in flight for `key` started before this call, so its result
    /// will not clear the stale flag.
    pub fn invalidate(&self, key: &str) -> bool {
        let changed = {
            let mut entries = write(&self.entries);
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.generation = entry.generation.wrapping_add(1);
                    !std::mem::replace(&mut entry.stale, true)
                }
                None => false,
            }
        };
        if changed {
            tracing::debug!(key, "cache entry invalidated");
            self.notify(key, &CacheEvent::Invalidated);
        }
        changed
    }

    pub fn contains(&self, key: &str) -> bool {
        read(&self.entries).contains_key(key)
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys, ordered.
    pub fn keys(&self) -> Vec<String> {
        read(&self.entries).keys().cloned().collect()
    }

    /// Whether a fetch for `key` is currently in flight.
    pub fn is_inflight(&self, key: &str) -> bool {
        lock(&self.inflight).contains_key(key)
    }

    // ====================================================================
    // Fetch
    // ====================================================================

    /// Fetch `request` and store the result under its cache key.
    ///
    /// Callers arriving while a fetch for the same key is pending join it
    /// instead of issuing another request; every joiner sees the same
    /// result. On failure the entry keeps its previous value. If the key
    /// was invalidated while the request was out, the entry is still stale
    /// afterwards and the caller should fetch again.
    pub async fn fetch(
        self: &Arc<Self>,
        transport: &Arc<dyn Transport>,
        request: Request,
    ) -> Result<CacheValue, ApiError> {
        let key = request.cache_key();
        let (fut, started) = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(&key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let fut = self.start_fetch(key.clone(), Arc::clone(transport), request);
                    inflight.insert(key.clone(), fut.clone());
                    (fut, true)
                }
            }
        };

        if started {
            tracing::debug!(key = %key, "fetch started");
            self.mark_pending(&key);
        } else {
            tracing::debug!(key = %key, "joined in-flight fetch");
        }
        fut.await
    }

    fn start_fetch(
        self: &Arc<Self>,
        key: String,
        transport: Arc<dyn Transport>,
        request: Request,
    ) -> SharedFetch {
        // Called with the inflight lock held; lock order allows this read.
        let generation = read(&self.entries).get(&key).map_or(0, |e| e.generation);
        let store = Arc::clone(self);
        async move {
            let result = transport.send(request).await;
            store.settle(&key, generation, result.map(|resp| resp.body))
        }
        .boxed()
        .shared()
    }

    /// Apply a finished fetch: store the value or the error, then release
    /// the in-flight slot.
    fn settle(
        &self,
        key: &str,
        generation: u64,
        result: Result<Value, ApiError>,
    ) -> Result<CacheValue, ApiError> {
        let outcome = result.map(CacheValue::new);
        if let Err(error) = &outcome {
            tracing::warn!(key, error = %error, "fetch failed");
        }
        self.record(key, outcome.clone(), Some(generation));
        lock(&self.inflight).remove(key);

        let event = match &outcome {
            Ok(_) => CacheEvent::Updated,
            Err(e) => CacheEvent::Failed(e.clone()),
        };
        self.notify(key, &event);
        outcome
    }

    fn mark_pending(&self, key: &str) {
        {
            // Lock order: inflight before entries.
            let inflight = lock(&self.inflight);
            if !inflight.contains_key(key) {
                // Already settled by a joiner; nothing is loading.
                return;
            }
            let mut entries = write(&self.entries);
            entries.entry(key.to_string()).or_insert_with(CacheEntry::pending).status =
                EntryStatus::Pending;
        }
        self.notify(key, &CacheEvent::Loading);
    }

    // ====================================================================
    // Subscriptions
    // ====================================================================

    /// Register a handler for changes to exactly `key`.
    pub fn subscribe<F>(&self, key: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &CacheEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = HandlerEntry { id, handler: Arc::new(handler) };
        write(&self.handlers).entry(key.to_string()).or_default().push(entry);
        id
    }

    /// Unsubscribe a handler by its key and subscription ID.
    pub fn unsubscribe(&self, key: &str, id: SubscriptionId) {
        let mut handlers = write(&self.handlers);
        if let Some(list) = handlers.get_mut(key) {
            list.retain(|h| h.id != id);
            if list.is_empty() {
                handlers.remove(key);
            }
        }
    }

    /// Number of live subscriptions on `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        read(&self.handlers).get(key).map_or(0, Vec::len)
    }

    fn notify(&self, key: &str, event: &CacheEvent) {
        // Clone the handler list so no lock is held while handlers run.
        let entries: Vec<HandlerEntry> = read(&self.handlers).get(key).cloned().unwrap_or_default();
        for entry in entries {
            (entry.handler)(key, event);
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

// Poisoning only means a handler panicked mid-update; the maps themselves
// are always left consistent, so keep serving them.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
