//! Scripted in-memory transport for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::Semaphore;
use ucsb_client::{ApiError, Method, Request, Response, Transport};

/// Answers requests from a route table and records every request.
///
/// A gated transport holds each request until `release` adds a permit.
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<String, Result<Response, ApiError>>>,
    requests: Mutex<Vec<Request>>,
    gate: Option<Semaphore>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
        })
    }

    /// Answer any method on `path` with 200 and `body`.
    pub fn respond(&self, path: &str, body: Value) {
        self.routes.lock().unwrap().insert(path.to_string(), Ok(Response::ok(body)));
    }

    /// Answer `method` on `path`; takes precedence over `respond`.
    pub fn respond_to(&self, method: Method, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{method} {path}"), Ok(Response::new(status, body)));
    }

    pub fn fail(&self, path: &str, error: ApiError) {
        self.routes.lock().unwrap().insert(path.to_string(), Err(error));
    }

    pub fn fail_on(&self, method: Method, path: &str, error: ApiError) {
        self.routes.lock().unwrap().insert(format!("{method} {path}"), Err(error));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Let `n` held requests complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Yield until at least `n` requests have arrived.
    pub async fn wait_for_requests(&self, n: usize) {
        for _ in 0..1000 {
            if self.request_count() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} requests, saw {}", self.request_count());
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: Request) -> Result<Response, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let routes = self.routes.lock().unwrap();
        routes
            .get(&format!("{} {}", request.method, request.path))
            .or_else(|| routes.get(&request.path))
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Server { status: 404, message: format!("no route for {}", request.path) })
            })
    }
}
