//! Reactive read accessor bound to one cache key.

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;
use ucsb_client::{ApiError, Request, Transport};

use crate::store::{CacheEvent, CacheStore, EntryStatus};
use crate::value::{CacheValue, SubscriptionId};

/// What a view needs to render a read.
#[derive(Debug, Clone, Default)]
pub struct FetchView {
    /// Last good value. Kept when a refresh fails.
    pub data: Option<CacheValue>,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<ApiError>,
}

/// Binds a cache key to a GET request.
///
/// While mounted, the binding refetches its key whenever the entry is
/// invalidated (this needs a tokio runtime; without one the next `load`
/// picks it up). Dropping the binding unmounts it; a response that lands
/// afterwards still updates the shared cache but nobody is told.
pub struct FetchBinding {
    store: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    request: Request,
    key: String,
    subscription: SubscriptionId,
    notifier: Arc<watch::Sender<u64>>,
    changes: watch::Receiver<u64>,
}

impl FetchBinding {
    /// Subscribe to `request`'s cache key. Call [`load`](Self::load) to
    /// issue the first fetch.
    pub fn mount(store: Arc<CacheStore>, transport: Arc<dyn Transport>, request: Request) -> Self {
        let (tx, rx) = watch::channel(0u64);
        let notifier = Arc::new(tx);
        let key = request.cache_key();
        let subscription = subscribe(&store, &transport, &request, &notifier);
        Self {
            store,
            transport,
            request,
            key,
            subscription,
            notifier,
            changes: rx,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Fetch if the key has no entry, is stale, or last failed; join any
    /// fetch already in flight. Returns the view once settled.
    pub async fn load(&self) -> FetchView {
        refresh(&self.store, &self.transport, self.request.clone()).await;
        self.view()
    }

    /// Current view, without fetching.
    ///
    /// A key with no entry yet reports `is_loading`: mounting implies a
    /// fetch is about to start.
    pub fn view(&self) -> FetchView {
        match self.store.get(&self.key) {
            None => FetchView { is_loading: true, ..FetchView::default() },
            Some(entry) => FetchView {
                data: entry.value,
                is_loading: entry.status == EntryStatus::Pending,
                is_error: entry.status == EntryStatus::Error,
                error: entry.error,
            },
        }
    }

    /// Point the binding at a new request. When the cache key changes the
    /// subscription moves with it; either way the new key is loaded.
    pub async fn rebind(&mut self, request: Request) -> FetchView {
        let key = request.cache_key();
        if key != self.key {
            tracing::debug!(from = %self.key, to = %key, "fetch binding rebound");
            self.store.unsubscribe(&self.key, self.subscription);
            self.subscription = subscribe(&self.store, &self.transport, &request, &self.notifier);
            self.key = key;
        }
        self.request = request;
        self.notifier.send_modify(|v| *v = v.wrapping_add(1));
        self.load().await
    }

    /// Wait for the next change to the bound entry.
    pub async fn changed(&mut self) -> FetchView {
        // The sender lives as long as `self`, so this cannot fail.
        let _ = self.changes.changed().await;
        self.view()
    }
}

impl Drop for FetchBinding {
    fn drop(&mut self) {
        self.store.unsubscribe(&self.key, self.subscription);
    }
}

fn subscribe(
    store: &Arc<CacheStore>,
    transport: &Arc<dyn Transport>,
    request: &Request,
    notifier: &Arc<watch::Sender<u64>>,
) -> SubscriptionId {
    // Weak: the store owns this handler and must not be kept alive by it.
    let weak: Weak<CacheStore> = Arc::downgrade(store);
    let transport = Arc::clone(transport);
    let request = request.clone();
    let notifier = Arc::clone(notifier);

    store.subscribe(&request.cache_key(), move |key, event| {
        notifier.send_modify(|v| *v = v.wrapping_add(1));
        if !matches!(event, CacheEvent::Invalidated) {
            return;
        }
        let (Some(store), Ok(handle)) = (weak.upgrade(), Handle::try_current()) else {
            return;
        };
        tracing::debug!(key, "refetching invalidated key");
        let transport = Arc::clone(&transport);
        let request = request.clone();
        handle.spawn(async move {
            refresh(&store, &transport, request).await;
        });
    })
}

/// Fetch `request` unless its entry is fresh. Failures are recorded on the
/// entry, so the result is not returned.
///
/// A joined fetch may have been sent before the latest invalidation; it
/// then settles stale and is followed by another fetch.
async fn refresh(store: &Arc<CacheStore>, transport: &Arc<dyn Transport>, request: Request) {
    let key = request.cache_key();
    let needed = store.is_inflight(&key) || store.get(&key).is_none_or(|e| e.needs_fetch());
    if !needed {
        return;
    }
    loop {
        let _ = store.fetch(transport, request.clone()).await;
        if !store.get(&key).is_some_and(|e| e.stale) {
            break;
        }
        tracing::debug!(key = %key, "invalidated during fetch, fetching again");
    }
}
