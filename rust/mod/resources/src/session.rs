//! Session collaborators: current user, system info, and role gating.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ucsb_client::{ApiError, Request, Transport};
use ucsb_flux::{CacheStore, FetchBinding};

pub const CURRENT_USER_PATH: &str = "/api/currentUser";
pub const SYSTEM_INFO_PATH: &str = "/api/systemInfo";

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    pub authority: String,
}

/// Body of `GET /api/currentUser`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRoot {
    pub user: UserInfo,
    #[serde(default)]
    pub roles: Vec<Authority>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub logged_in: bool,
    pub root: Option<UserRoot>,
}

impl CurrentUser {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn logged_in(root: UserRoot) -> Self {
        Self { logged_in: true, root: Some(root) }
    }

    pub fn email(&self) -> Option<&str> {
        self.root.as_ref().map(|r| r.user.email.as_str())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.logged_in
            && self
                .root
                .as_ref()
                .is_some_and(|r| r.roles.iter().any(|a| a.authority == role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    pub fn is_user(&self) -> bool {
        self.has_role(ROLE_USER)
    }
}

/// Global feature flags from `GET /api/systemInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemInfo {
    pub spring_h2_console_enabled: Option<bool>,
    #[serde(rename = "showSwaggerUILink")]
    pub show_swagger_ui_link: Option<bool>,
    pub source_repo: Option<String>,
    pub commit_message: Option<String>,
    pub commit_id: Option<String>,
    pub github_url: Option<String>,
}

// ── Role gating ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_write(self) -> bool {
        !matches!(self, Action::Read)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("you must be logged in to {0} records")]
    NotLoggedIn(Action),

    #[error("{0} requires the ROLE_ADMIN role")]
    NotAdmin(Action),
}

/// Reads need a logged-in user; writes need an admin.
pub fn authorize(user: &CurrentUser, action: Action) -> Result<(), AccessDenied> {
    if !user.logged_in {
        return Err(AccessDenied::NotLoggedIn(action));
    }
    if action.is_write() && !user.is_admin() {
        return Err(AccessDenied::NotAdmin(action));
    }
    Ok(())
}

// ── Session ─────────────────────────────────────────────────────────

/// The two read-mostly collaborators, loaded through the shared cache.
pub struct Session {
    current_user: FetchBinding,
    system_info: FetchBinding,
}

impl Session {
    pub fn mount(store: Arc<CacheStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            current_user: FetchBinding::mount(
                store.clone(),
                transport.clone(),
                Request::get(CURRENT_USER_PATH),
            ),
            system_info: FetchBinding::mount(store, transport, Request::get(SYSTEM_INFO_PATH)),
        }
    }

    /// Load the signed-in user. A 401 or 403 means nobody is signed in.
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let view = self.current_user.load().await;
        match (view.error, view.data) {
            (Some(e), _) if matches!(e.status(), Some(401 | 403)) => Ok(CurrentUser::anonymous()),
            (_, Some(data)) => user_from_body(&data),
            (Some(e), None) => Err(e),
            (None, None) => Ok(CurrentUser::anonymous()),
        }
    }

    pub async fn system_info(&self) -> Result<SystemInfo, ApiError> {
        let view = self.system_info.load().await;
        match (view.data, view.error) {
            (Some(data), _) => data.decode(),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(SystemInfo::default()),
        }
    }
}

fn user_from_body(body: &Value) -> Result<CurrentUser, ApiError> {
    // An empty body is an anonymous session.
    if body.is_null() || body.as_str().is_some_and(str::is_empty) {
        return Ok(CurrentUser::anonymous());
    }
    let root: UserRoot =
        serde_json::from_value(body.clone()).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(CurrentUser::logged_in(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, admin_body};
    use serde_json::json;
    use ucsb_client::Method;

    #[test]
    fn role_checks() {
        let user: UserRoot = serde_json::from_value(admin_body()).unwrap();
        let admin = CurrentUser::logged_in(user);
        assert!(admin.is_admin());
        assert!(admin.is_user());
        assert_eq!(admin.email(), Some("phtcon@ucsb.edu"));

        let plain = CurrentUser::logged_in(UserRoot {
            user: UserInfo { email: "cgaucho@ucsb.edu".into(), ..Default::default() },
            roles: vec![Authority { authority: ROLE_USER.into() }],
        });
        assert!(!plain.is_admin());
        assert!(plain.is_user());

        assert!(!CurrentUser::anonymous().is_user());
    }

    #[test]
    fn authorize_gates_writes_on_admin() {
        let admin = CurrentUser::logged_in(serde_json::from_value(admin_body()).unwrap());
        let plain = CurrentUser::logged_in(UserRoot {
            user: UserInfo::default(),
            roles: vec![Authority { authority: ROLE_USER.into() }],
        });
        let nobody = CurrentUser::anonymous();

        assert_eq!(authorize(&admin, Action::Delete), Ok(()));
        assert_eq!(authorize(&plain, Action::Read), Ok(()));
        assert_eq!(authorize(&plain, Action::Create), Err(AccessDenied::NotAdmin(Action::Create)));
        assert_eq!(authorize(&nobody, Action::Read), Err(AccessDenied::NotLoggedIn(Action::Read)));
        assert_eq!(
            AccessDenied::NotAdmin(Action::Update).to_string(),
            "update requires the ROLE_ADMIN role"
        );
    }

    #[test]
    fn system_info_decodes_camel_case() {
        let info: SystemInfo = serde_json::from_value(json!({
            "springH2ConsoleEnabled": false,
            "showSwaggerUILink": true,
            "sourceRepo": "https://github.com/ucsb-cs156/proj-ucsb-courses",
        }))
        .unwrap();
        assert_eq!(info.show_swagger_ui_link, Some(true));
        assert_eq!(info.spring_h2_console_enabled, Some(false));
        assert_eq!(info.commit_id, None);
    }

    #[tokio::test]
    async fn session_loads_user_once() {
        let transport = ScriptedTransport::new();
        transport.reply(Method::Get, CURRENT_USER_PATH, 200, admin_body());
        transport.reply(Method::Get, SYSTEM_INFO_PATH, 200, json!({"showSwaggerUILink": true}));
        let store = Arc::new(CacheStore::new());

        let session = Session::mount(store.clone(), transport.clone());
        let user = session.current_user().await.unwrap();
        assert!(user.is_admin());
        let again = Session::mount(store, transport.clone());
        assert!(again.current_user().await.unwrap().logged_in);
        assert_eq!(transport.count(Method::Get, CURRENT_USER_PATH), 1);

        let info = session.system_info().await.unwrap();
        assert_eq!(info.show_swagger_ui_link, Some(true));
    }

    #[tokio::test]
    async fn unauthorized_means_anonymous() {
        let transport = ScriptedTransport::new();
        transport.fail(
            Method::Get,
            CURRENT_USER_PATH,
            ApiError::Server { status: 401, message: "Unauthorized".into() },
        );
        let session = Session::mount(Arc::new(CacheStore::new()), transport);
        let user = session.current_user().await.unwrap();
        assert!(!user.logged_in);
        assert_eq!(user.email(), None);
    }

    #[tokio::test]
    async fn network_failure_is_reported() {
        let transport = ScriptedTransport::new();
        transport.fail(Method::Get, CURRENT_USER_PATH, ApiError::Timeout);
        let session = Session::mount(Arc::new(CacheStore::new()), transport);
        assert_eq!(session.current_user().await, Err(ApiError::Timeout));
    }
}
