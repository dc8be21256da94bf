use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use ucsb_client::ApiError;

/// A cached response body, shared by every reader of the same key.
///
/// Wraps `Arc<Value>`; clone is an atomic increment, never a copy of the
/// JSON. Readers get a snapshot and cannot mutate the cached data.
#[derive(Clone, PartialEq)]
pub struct CacheValue {
    inner: Arc<Value>,
}

impl CacheValue {
    pub fn new(value: Value) -> Self {
        Self { inner: Arc::new(value) }
    }

    pub fn get(&self) -> &Value {
        &self.inner
    }

    /// Deserialize the snapshot into a typed view.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        <T as serde::Deserialize>::deserialize(self.inner.as_ref()).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Whether two snapshots are the same allocation.
    pub fn ptr_eq(&self, other: &CacheValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to the underlying value.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl std::ops::Deref for CacheValue {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.inner
    }
}

impl fmt::Debug for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

/// Unique handle for a subscription, returned by `CacheStore::subscribe()`.
///
/// Use this to unsubscribe later via `CacheStore::unsubscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn clone_shares_arc() {
        let v1 = CacheValue::new(json!([{"id": 1}]));
        assert_eq!(v1.ref_count(), 1);

        let v2 = v1.clone();
        assert_eq!(v1.ref_count(), 2);
        assert!(v1.ptr_eq(&v2));

        drop(v2);
        assert_eq!(v1.ref_count(), 1);
    }

    #[test]
    fn equal_content_is_not_same_allocation() {
        let a = CacheValue::new(json!({"id": 1}));
        let b = CacheValue::new(json!({"id": 1}));
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn decode_typed() {
        #[derive(Debug, Deserialize)]
        struct Row {
            id: i64,
        }
        let v = CacheValue::new(json!([{"id": 1}, {"id": 2}]));
        let rows: Vec<Row> = v.decode().unwrap();
        assert_eq!(rows.iter().map(|r| r.id).sum::<i64>(), 3);
        assert_eq!(v[0]["id"], json!(1));

        let err = v.decode::<Row>().unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
