//! Write accessor: validate, send, then invalidate.

use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tokio::task::JoinHandle;
use ucsb_client::{ApiError, Method, Request, Response, Transport};
use ucsb_core::Record;
use ucsb_schema::{EntitySchema, FieldErrors, ValidatedRecord, validate};

use crate::store::CacheStore;

/// A write request plus the cache keys it makes stale.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationDescriptor {
    pub method: Method,
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Every key whose collection or singleton the write affects.
    pub invalidates: Vec<String>,
}

impl MutationDescriptor {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            params: Vec::new(),
            body: None,
            invalidates: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn invalidate(mut self, key: impl Into<String>) -> Self {
        self.invalidates.push(key.into());
        self
    }

    pub fn to_request(&self) -> Request {
        Request {
            method: self.method,
            path: self.endpoint.clone(),
            params: self.params.clone(),
            body: self.body.clone(),
        }
    }
}

/// A write that reached the backend and failed.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationFailure {
    pub method: Method,
    pub endpoint: String,
    pub error: ApiError,
}

impl MutationFailure {
    /// Generic user-facing failure text.
    pub fn banner(&self) -> String {
        format!("Error communicating with backend via {} on {}", self.method, self.endpoint)
    }
}

/// Result of one `mutate` call.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Rejected locally; nothing was sent.
    Invalid(FieldErrors),
    Succeeded(Response),
    Failed(MutationFailure),
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MutationOutcome::Succeeded(_))
    }
}

/// Caller-visible state of the most recent mutation.
#[derive(Debug, Clone, Default)]
pub struct MutationStatus {
    pub pending: bool,
    pub is_success: bool,
    pub field_errors: FieldErrors,
    pub failure: Option<MutationFailure>,
    /// Server body of the last successful write.
    pub response: Option<Value>,
}

/// Maps a validated record to the request that writes it. May reject the
/// record with field errors (for example, an update without a key).
pub type DescriptorBuilder =
    Arc<dyn Fn(&ValidatedRecord) -> Result<MutationDescriptor, FieldErrors> + Send + Sync>;

/// Callback for completed writes. Receives `Succeeded` or `Failed`, never
/// `Invalid`.
pub type OutcomeListener = Arc<dyn Fn(&MutationOutcome) + Send + Sync>;

/// Runs the write pipeline for one entity operation.
///
/// 1. Validate the raw input; on errors report them and stop.
/// 2. Build the descriptor.
/// 3. Send it.
/// 4. On success, tell listeners, then invalidate `descriptor.invalidates`.
/// 5. On failure, tell listeners and invalidate nothing. A DELETE answered
///    with 404 is the exception: the record is gone either way, so its
///    keys are still invalidated.
pub struct MutationBinding {
    store: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    schema: Arc<EntitySchema>,
    build: DescriptorBuilder,
    listeners: RwLock<Vec<OutcomeListener>>,
    status: Mutex<MutationStatus>,
}

impl MutationBinding {
    pub fn new<F>(
        store: Arc<CacheStore>,
        transport: Arc<dyn Transport>,
        schema: Arc<EntitySchema>,
        build: F,
    ) -> Self
    where
        F: Fn(&ValidatedRecord) -> Result<MutationDescriptor, FieldErrors> + Send + Sync + 'static,
    {
        Self {
            store,
            transport,
            schema,
            build: Arc::new(build),
            listeners: RwLock::new(Vec::new()),
            status: Mutex::new(MutationStatus::default()),
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Register a listener for completed writes.
    pub fn on_outcome<F>(&self, listener: F)
    where
        F: Fn(&MutationOutcome) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(listener));
    }

    pub fn status(&self) -> MutationStatus {
        self.lock_status().clone()
    }

    /// Start the pipeline on the current runtime and return immediately.
    pub fn trigger(self: &Arc<Self>, raw: Record) -> JoinHandle<MutationOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.mutate(&raw).await })
    }

    /// Run the pipeline to completion.
    pub async fn mutate(&self, raw: &Record) -> MutationOutcome {
        match self.prepare(raw) {
            Ok(descriptor) => self.send(descriptor).await,
            Err(errors) => MutationOutcome::Invalid(errors),
        }
    }

    /// Validate `raw` and build its descriptor without sending anything.
    /// Rejections are recorded in [`status`](Self::status).
    pub fn prepare(&self, raw: &Record) -> Result<MutationDescriptor, FieldErrors> {
        let built = validate(&self.schema, raw).and_then(|v| (self.build)(&v));
        if let Err(errors) = &built {
            tracing::warn!(entity = self.schema.name(), errors = %errors, "submission rejected");
            *self.lock_status() = MutationStatus {
                field_errors: errors.clone(),
                ..MutationStatus::default()
            };
        }
        built
    }

    /// Send a prepared descriptor, tell listeners, then invalidate.
    pub async fn send(&self, descriptor: MutationDescriptor) -> MutationOutcome {
        *self.lock_status() = MutationStatus { pending: true, ..MutationStatus::default() };

        let outcome = match self.transport.send(descriptor.to_request()).await {
            Ok(response) => {
                tracing::info!(
                    method = %descriptor.method,
                    endpoint = %descriptor.endpoint,
                    status = response.status,
                    "mutation succeeded"
                );
                MutationOutcome::Succeeded(response)
            }
            Err(error) => {
                tracing::warn!(
                    method = %descriptor.method,
                    endpoint = %descriptor.endpoint,
                    error = %error,
                    "mutation failed"
                );
                MutationOutcome::Failed(MutationFailure {
                    method: descriptor.method,
                    endpoint: descriptor.endpoint.clone(),
                    error,
                })
            }
        };

        {
            let mut status = self.lock_status();
            *status = MutationStatus::default();
            match &outcome {
                MutationOutcome::Succeeded(resp) => {
                    status.is_success = true;
                    status.response = Some(resp.body.clone());
                }
                MutationOutcome::Failed(failure) => status.failure = Some(failure.clone()),
                MutationOutcome::Invalid(_) => {}
            }
        }

        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner()).clone();
        for listener in &listeners {
            listener(&outcome);
        }

        let gone = match &outcome {
            MutationOutcome::Succeeded(_) => true,
            MutationOutcome::Failed(f) => descriptor.method == Method::Delete && f.error.is_not_found(),
            MutationOutcome::Invalid(_) => false,
        };
        if gone {
            for key in &descriptor.invalidates {
                self.store.invalidate(key);
            }
        }
        outcome
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, MutationStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use serde_json::json;
    use ucsb_core::RecordKey;
    use ucsb_schema::{FieldDef, KeyDef};

    const ALL: &str = "/api/menuitemreview/all";
    const ONE: &str = "/api/menuitemreview?id=3";

    fn schema() -> Arc<EntitySchema> {
        Arc::new(
            EntitySchema::new(
                "MenuItemReview",
                KeyDef::id(),
                vec![
                    FieldDef::text("comments", "Comments").required(),
                    FieldDef::integer("stars", "Stars").required().range(0.0, 5.0),
                ],
            )
            .unwrap(),
        )
    }

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn update(v: &ValidatedRecord) -> Result<MutationDescriptor, FieldErrors> {
        let Some(key) = v.key() else {
            let mut errors = FieldErrors::new();
            errors.insert("id", "Id is required.");
            return Err(errors);
        };
        let mut body = serde_json::Map::new();
        for (k, val) in v.iter() {
            body.insert(k.to_string(), val.clone());
        }
        Ok(MutationDescriptor::new(Method::Put, "/api/menuitemreview")
            .param("id", key.to_string())
            .body(Value::Object(body))
            .invalidate(format!("/api/menuitemreview?id={key}"))
            .invalidate(ALL))
    }

    fn delete(v: &ValidatedRecord) -> Result<MutationDescriptor, FieldErrors> {
        let key = v.key().cloned().unwrap_or(RecordKey::Id(0));
        Ok(MutationDescriptor::new(Method::Delete, "/api/menuitemreview")
            .param("id", key.to_string())
            .invalidate(format!("/api/menuitemreview?id={key}"))
            .invalidate(ALL))
    }

    fn primed_store() -> Arc<CacheStore> {
        let store = Arc::new(CacheStore::new());
        store.set(ALL, json!([{"id": 3}]));
        store.set(ONE, json!({"id": 3}));
        store
    }

    // ========================================================================
    // Validation before transport
    // ========================================================================

    #[tokio::test]
    async fn invalid_input_sends_nothing() {
        let store = primed_store();
        let fake = FakeTransport::new();
        let binding = MutationBinding::new(store.clone(), fake.clone(), schema(), update);
        let heard = Arc::new(Mutex::new(0));
        let h = heard.clone();
        binding.on_outcome(move |_| *h.lock().unwrap() += 1);

        let outcome = binding.mutate(&record(json!({"id": 3, "comments": "ok", "stars": 6}))).await;
        let MutationOutcome::Invalid(errors) = outcome else {
            panic!("expected Invalid, got {outcome:?}");
        };
        assert_eq!(errors.get("stars"), Some("Stars must be at most 5"));
        assert_eq!(fake.request_count(), 0);
        assert_eq!(*heard.lock().unwrap(), 0);

        let status = binding.status();
        assert!(!status.pending);
        assert!(!status.is_success);
        assert_eq!(status.field_errors.get("stars"), Some("Stars must be at most 5"));
        assert!(!store.get(ALL).unwrap().stale);
    }

    #[tokio::test]
    async fn builder_rejection_is_reported_as_field_errors() {
        let fake = FakeTransport::new();
        let binding = MutationBinding::new(primed_store(), fake.clone(), schema(), update);

        let outcome = binding.mutate(&record(json!({"comments": "ok", "stars": 4}))).await;
        let MutationOutcome::Invalid(errors) = outcome else {
            panic!("expected Invalid");
        };
        assert_eq!(errors.get("id"), Some("Id is required."));
        assert_eq!(fake.request_count(), 0);
    }

    // ========================================================================
    // Success and failure
    // ========================================================================

    #[tokio::test]
    async fn success_notifies_then_invalidates() {
        let store = primed_store();
        let fake = FakeTransport::new();
        fake.respond_to(Method::Put, "/api/menuitemreview", 200, json!({"id": 3, "stars": 4}));
        let binding = MutationBinding::new(store.clone(), fake.clone(), schema(), update);

        let seen_stale = Arc::new(Mutex::new(None));
        let s = store.clone();
        let seen = seen_stale.clone();
        binding.on_outcome(move |outcome| {
            assert!(outcome.is_success());
            *seen.lock().unwrap() = Some(s.get(ALL).unwrap().stale);
        });

        let outcome = binding
            .mutate(&record(json!({"id": "3", "comments": "better now", "stars": "4"})))
            .await;
        assert!(outcome.is_success());

        // Listener ran before invalidation.
        assert_eq!(*seen_stale.lock().unwrap(), Some(false));
        assert!(store.get(ALL).unwrap().stale);
        assert!(store.get(ONE).unwrap().stale);

        let sent = &fake.requests()[0];
        assert_eq!(sent.method, Method::Put);
        assert_eq!(sent.param_value("id"), Some("3"));
        assert_eq!(sent.body, Some(json!({"comments": "better now", "stars": 4})));

        let status = binding.status();
        assert!(status.is_success);
        assert_eq!(status.response, Some(json!({"id": 3, "stars": 4})));
    }

    #[tokio::test]
    async fn failure_invalidates_nothing() {
        let store = primed_store();
        let fake = FakeTransport::new();
        fake.fail_on(
            Method::Put,
            "/api/menuitemreview",
            ApiError::Server { status: 500, message: "boom".into() },
        );
        let binding = MutationBinding::new(store.clone(), fake.clone(), schema(), update);

        let outcome = binding.mutate(&record(json!({"id": 3, "comments": "x", "stars": 1}))).await;
        let MutationOutcome::Failed(failure) = outcome else {
            panic!("expected Failed");
        };
        assert_eq!(
            failure.banner(),
            "Error communicating with backend via PUT on /api/menuitemreview"
        );
        assert!(!store.get(ALL).unwrap().stale);
        assert!(!store.get(ONE).unwrap().stale);
        assert_eq!(binding.status().failure, Some(failure));
    }

    #[tokio::test]
    async fn delete_not_found_still_invalidates() {
        let store = primed_store();
        let fake = FakeTransport::new();
        fake.fail_on(
            Method::Delete,
            "/api/menuitemreview",
            ApiError::Server { status: 404, message: "MenuItemReview with id 3 not found".into() },
        );
        let key_schema = Arc::new(
            EntitySchema::new("MenuItemReview key", KeyDef::id(), vec![FieldDef::integer("id", "Id").required()])
                .unwrap(),
        );
        let binding = MutationBinding::new(store.clone(), fake.clone(), key_schema, delete);

        let outcome = binding.mutate(&record(json!({"id": 3}))).await;
        assert!(matches!(&outcome, MutationOutcome::Failed(f) if f.error.is_not_found()));
        assert!(store.get(ALL).unwrap().stale);
        assert!(store.get(ONE).unwrap().stale);
    }

    #[tokio::test]
    async fn delete_server_error_does_not_invalidate() {
        let store = primed_store();
        let fake = FakeTransport::new();
        fake.fail_on(Method::Delete, "/api/menuitemreview", ApiError::Timeout);
        let key_schema = Arc::new(
            EntitySchema::new("MenuItemReview key", KeyDef::id(), vec![FieldDef::integer("id", "Id").required()])
                .unwrap(),
        );
        let binding = MutationBinding::new(store.clone(), fake.clone(), key_schema, delete);

        binding.mutate(&record(json!({"id": 3}))).await;
        assert!(!store.get(ALL).unwrap().stale);
    }

    #[tokio::test]
    async fn prepare_then_send_matches_mutate() {
        let store = primed_store();
        let fake = FakeTransport::new();
        fake.respond_to(Method::Put, "/api/menuitemreview", 200, json!({"id": 3}));
        let binding = MutationBinding::new(store.clone(), fake.clone(), schema(), update);

        let descriptor = binding
            .prepare(&record(json!({"id": 3, "comments": "fine", "stars": 2})))
            .unwrap();
        assert_eq!(descriptor.invalidates, vec![ONE.to_string(), ALL.to_string()]);
        assert_eq!(fake.request_count(), 0);
        assert!(!binding.status().pending);

        let outcome = binding.send(descriptor).await;
        assert!(outcome.is_success());
        assert!(store.get(ONE).unwrap().stale);
    }

    #[test]
    fn prepare_records_field_errors() {
        let binding = MutationBinding::new(primed_store(), FakeTransport::new(), schema(), update);
        let errors = binding.prepare(&record(json!({"id": 3}))).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["comments", "stars"]);
        assert_eq!(binding.status().field_errors, errors);
    }

    // ========================================================================
    // Trigger
    // ========================================================================

    #[tokio::test]
    async fn trigger_reports_pending_until_response() {
        let fake = FakeTransport::gated();
        fake.respond("/api/menuitemreview", json!({"id": 3}));
        let binding = Arc::new(MutationBinding::new(primed_store(), fake.clone(), schema(), update));

        let handle = binding.trigger(record(json!({"id": 3, "comments": "x", "stars": 0})));
        fake.wait_for_requests(1).await;
        assert!(binding.status().pending);

        fake.release(1);
        let outcome = handle.await.unwrap();
        assert!(outcome.is_success());
        let status = binding.status();
        assert!(!status.pending);
        assert!(status.is_success);
    }
}
