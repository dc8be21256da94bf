//! Scripted transport, recording presenter and user fixtures for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use ucsb_client::{ApiError, Method, Request, Response, Transport};

use crate::presenter::Presenter;
use crate::session::{CurrentUser, UserRoot};

/// Answers `(method, path)` pairs from a script and records every request.
/// Unscripted requests get a 404.
pub(crate) struct ScriptedTransport {
    script: Mutex<HashMap<(Method, String), Result<Response, ApiError>>>,
    log: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn reply(&self, method: Method, path: &str, status: u16, body: Value) {
        self.script
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Ok(Response::new(status, body)));
    }

    pub fn fail(&self, method: Method, path: &str, error: ApiError) {
        self.script.lock().unwrap().insert((method, path.to_string()), Err(error));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Requests other than session lookups.
    pub fn writes(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != Method::Get)
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Response, ApiError> {
        let key = (request.method, request.path.clone());
        self.log.lock().unwrap().push(request);
        tokio::task::yield_now().await;
        self.script.lock().unwrap().get(&key).cloned().unwrap_or_else(|| {
            Err(ApiError::Server { status: 404, message: format!("no route for {} {}", key.0, key.1) })
        })
    }
}

/// Records presenter calls as `notify: ..`, `navigate: ..`, `error: ..`.
#[derive(Default)]
pub(crate) struct RecordingPresenter {
    events: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Presenter for RecordingPresenter {
    fn notify(&self, message: &str) {
        self.events.lock().unwrap().push(format!("notify: {message}"));
    }

    fn navigate(&self, route: &str) {
        self.events.lock().unwrap().push(format!("navigate: {route}"));
    }

    fn error(&self, message: &str) {
        self.events.lock().unwrap().push(format!("error: {message}"));
    }
}

pub(crate) fn admin_body() -> Value {
    json!({
        "user": {"id": 1, "email": "phtcon@ucsb.edu", "fullName": "Phill Conrad"},
        "roles": [{"authority": "ROLE_ADMIN"}, {"authority": "ROLE_USER"}],
    })
}

pub(crate) fn user_body() -> Value {
    json!({
        "user": {"id": 2, "email": "cgaucho@ucsb.edu", "fullName": "Chris Gaucho"},
        "roles": [{"authority": "ROLE_USER"}],
    })
}

pub(crate) fn admin() -> CurrentUser {
    CurrentUser::logged_in(serde_json::from_value::<UserRoot>(admin_body()).unwrap())
}

pub(crate) fn plain_user() -> CurrentUser {
    CurrentUser::logged_in(serde_json::from_value::<UserRoot>(user_body()).unwrap())
}
