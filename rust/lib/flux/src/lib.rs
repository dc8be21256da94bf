//! Flux: the resource synchronization layer.
//!
//! A keyed response cache with subscriber notification, plus the two
//! accessors views use to talk to the backend through it.
//!
//! # Pieces
//!
//! - [`CacheStore`]: `get`, `set`, `invalidate`, `subscribe`, and a
//!   single-flight `fetch` (at most one request in flight per key)
//! - [`FetchBinding`]: reactive read bound to one key; refetches when the
//!   key is invalidated
//! - [`MutationBinding`]: validate, send, notify, then invalidate the
//!   keys the write made stale
//!
//! # Cache keys
//!
//! A key is the request path plus its query parameters sorted by name:
//! `/api/helprequests/all`, `/api/recommendationrequest?id=17`.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(CacheStore::new());
//! let list = FetchBinding::mount(store.clone(), transport.clone(), Request::get("/api/articles/all"));
//! let view = list.load().await;
//!
//! let create = MutationBinding::new(store, transport, schema, |v| Ok(describe_create(v)));
//! create.mutate(&raw).await; // invalidates /api/articles/all; `list` refetches
//! ```

pub mod fetch;
pub mod mutation;
pub mod store;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchBinding, FetchView};
pub use mutation::{
    DescriptorBuilder, MutationBinding, MutationDescriptor, MutationFailure, MutationOutcome,
    MutationStatus, OutcomeListener,
};
pub use store::{CacheEntry, CacheEvent, CacheStore, ChangeHandler, EntryStatus};
pub use value::{CacheValue, SubscriptionId};
