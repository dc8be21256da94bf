//! Resource commands.
//!
//! `ucsb get articles`, `ucsb create helprequest --json '{...}'`, etc.
//! Each command goes through the same controllers a view would use, so
//! validation and role checks happen before anything is sent.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde_json::Value;
use ucsb_client::HttpTransport;
use ucsb_core::{Record, RecordKey, param_string};
use ucsb_resources::{AppContext, EntityDef, Presenter, ResourceController, SubmitOutcome};
use ucsb_schema::FieldErrors;

use crate::config::CliConfig;

/// Prints confirmations; errors are reported by the command's result.
pub struct CliPresenter;

impl Presenter for CliPresenter {
    fn notify(&self, message: &str) {
        println!("{message}");
    }

    fn navigate(&self, route: &str) {
        tracing::debug!(route, "navigate");
    }

    fn error(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Submission rejected locally. Displayed one `field: message` per line.
#[derive(Debug)]
pub struct ValidationFailed(pub FieldErrors);

impl fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailed {}

/// Build the application against the current context's server.
pub fn connect(config_path: &Path, timeout_secs: u64) -> Result<AppContext> {
    let config = CliConfig::load(config_path)?;
    let ctx = config
        .current()
        .ok_or_else(|| anyhow!("No current context. Run `ucsb use context <name>`."))?;
    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `ucsb context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }
    let transport = HttpTransport::new(&ctx.client_config(timeout_secs))?;
    Ok(AppContext::new(Arc::new(transport), Arc::new(CliPresenter))?)
}

/// List a collection, or show one record when `key` is given.
pub async fn get(app: &AppContext, resource: &str, key: Option<&str>, json: bool) -> Result<String> {
    let controller = app.controller(resource)?;
    let user = app.session().current_user().await?;

    let binding = match key {
        Some(raw) => controller.get(&user, &parse_key(&controller, raw)?)?,
        None => controller.list(&user)?,
    };
    let view = binding.load().await;
    if let Some(error) = view.error {
        return Err(anyhow!(error).context(format!("GET {}", binding.key())));
    }
    let data = view.data.ok_or_else(|| anyhow!("GET {} returned nothing", binding.key()))?;

    if json || key.is_some() {
        Ok(serde_json::to_string_pretty(&*data)?)
    } else {
        Ok(render_table(controller.entity(), &data))
    }
}

pub async fn create(app: &AppContext, resource: &str, json_body: &str) -> Result<String> {
    let controller = app.controller(resource)?;
    let input = parse_record(json_body)?;
    let user = app.session().current_user().await?;

    let mut form = controller.create_form();
    finish(form.submit(&user, &input).await?)
}

/// Update fields of an existing record. Fields not given keep their
/// current values.
pub async fn update(app: &AppContext, resource: &str, key: &str, json_body: &str) -> Result<String> {
    let controller = app.controller(resource)?;
    let input = parse_record(json_body)?;
    let key = parse_key(&controller, key)?;
    let user = app.session().current_user().await?;

    let mut form = controller.edit_form(&user, key).await?;
    finish(form.submit(&user, &input).await?)
}

pub async fn delete(app: &AppContext, resource: &str, key: &str) -> Result<String> {
    let controller = app.controller(resource)?;
    let key = parse_key(&controller, key)?;
    let user = app.session().current_user().await?;

    finish(controller.delete(&user, &key).await)
}

pub async fn whoami(app: &AppContext) -> Result<String> {
    let user = app.session().current_user().await?;
    let Some(root) = user.root.as_ref().filter(|_| user.logged_in) else {
        return Ok("Not logged in.".to_string());
    };
    let roles: Vec<&str> = root.roles.iter().map(|r| r.authority.as_str()).collect();
    Ok(format!("{} [{}]", root.user.email, roles.join(", ")))
}

fn finish(outcome: SubmitOutcome) -> Result<String> {
    match outcome {
        SubmitOutcome::Saved { response, .. } => match response.body {
            Value::Null => Ok(String::new()),
            body => Ok(serde_json::to_string_pretty(&body)?),
        },
        SubmitOutcome::Invalid(errors) => Err(ValidationFailed(errors).into()),
        SubmitOutcome::Forbidden(denied) => Err(denied.into()),
        SubmitOutcome::Failed(failure) => Err(anyhow!(failure.error.clone()).context(failure.banner())),
    }
}

fn parse_record(json_body: &str) -> Result<Record> {
    match serde_json::from_str::<Value>(json_body).map_err(|e| anyhow!("Invalid JSON: {e}"))? {
        Value::Object(record) => Ok(record),
        _ => anyhow::bail!("Invalid JSON: expected an object"),
    }
}

fn parse_key(controller: &ResourceController, raw: &str) -> Result<RecordKey> {
    let entity = controller.entity();
    entity
        .parse_key(raw)
        .ok_or_else(|| anyhow!("Invalid {} for {}: {raw}", entity.key().name, entity.name()))
}

const MAX_CELL: usize = 40;

/// Plain-text table: the key column, then schema fields in order.
fn render_table(entity: &EntityDef, data: &Value) -> String {
    let key_name = entity.key().name.as_str();
    let mut columns: Vec<&str> = Vec::new();
    if entity.schema().field(key_name).is_none() {
        columns.push(key_name);
    }
    columns.extend(entity.schema().fields().iter().map(|f| f.name.as_str()));

    let rows: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell(row.get(*c))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<width$}", width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(columns.clone())];
    for row in &cells {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

fn cell(value: Option<&Value>) -> String {
    let text = value.and_then(param_string).unwrap_or_default();
    if text.chars().count() > MAX_CELL {
        let cut: String = text.chars().take(MAX_CELL - 3).collect();
        format!("{cut}...")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;
    use ucsb_client::{ApiError, Method, Request, Response, Transport};

    #[derive(Default)]
    struct Canned {
        routes: Mutex<HashMap<(Method, String), Response>>,
        seen: Mutex<Vec<Request>>,
    }

    impl Canned {
        fn with(self, method: Method, path: &str, body: Value) -> Self {
            self.routes.lock().unwrap().insert((method, path.to_string()), Response::ok(body));
            self
        }
    }

    #[async_trait::async_trait]
    impl Transport for Canned {
        async fn send(&self, request: Request) -> Result<Response, ApiError> {
            let key = (request.method, request.path.clone());
            self.seen.lock().unwrap().push(request);
            self.routes
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .ok_or(ApiError::Server { status: 404, message: "not found".into() })
        }
    }

    fn admin() -> Value {
        json!({"user": {"email": "phtcon@ucsb.edu"}, "roles": [{"authority": "ROLE_ADMIN"}]})
    }

    fn app(canned: Canned) -> (AppContext, Arc<Canned>) {
        let canned = Arc::new(canned);
        let app = AppContext::new(canned.clone(), Arc::new(CliPresenter)).unwrap();
        (app, canned)
    }

    #[tokio::test]
    async fn get_renders_table() {
        let (app, _) = app(Canned::default()
            .with(Method::Get, "/api/currentUser", admin())
            .with(
                Method::Get,
                "/api/ucsborganization/all",
                json!([
                    {"orgCode": "ZPR", "orgTranslationShort": "ZETA PHI RHO", "orgTranslation": "ZETA PHI RHO", "inactive": false},
                    {"orgCode": "SKY", "orgTranslationShort": "SKYDIVING CLUB", "orgTranslation": "SKYDIVING CLUB AT UCSB", "inactive": false},
                ]),
            ));

        let out = get(&app, "orgs", None, false).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("orgCode  orgTranslationShort"));
        assert!(lines[1].starts_with("ZPR      ZETA PHI RHO"));
        assert!(lines[2].ends_with("false"));
    }

    #[tokio::test]
    async fn create_reports_every_field_error() {
        let (app, canned) = app(Canned::default().with(Method::Get, "/api/currentUser", admin()));

        let err = create(&app, "menuitemreview", r#"{"itemId": 27, "stars": 6}"#).await.unwrap_err();
        let failed = err.downcast_ref::<ValidationFailed>().unwrap();
        assert_eq!(
            failed.to_string(),
            "reviewerEmail: Reviewer Email is required.\n\
             stars: Stars must be at most 5\n\
             dateReviewed: Date Reviewed is required.\n\
             comments: Comments is required."
        );
        assert!(canned.seen.lock().unwrap().iter().all(|r| r.method == Method::Get));
    }

    #[tokio::test]
    async fn create_prints_saved_record() {
        let (app, canned) = app(Canned::default()
            .with(Method::Get, "/api/currentUser", admin())
            .with(Method::Post, "/api/articles/post", json!({"id": 4, "title": "Rust"})));

        let out = create(
            &app,
            "articles",
            r#"{"title": "Rust", "url": "https://www.rust-lang.org", "explanation": "systems",
                "email": "phtcon@ucsb.edu", "dateAdded": "2022-04-20T00:00:00"}"#,
        )
        .await
        .unwrap();
        assert!(out.contains("\"id\": 4"));
        let seen = canned.seen.lock().unwrap();
        let post = seen.iter().find(|r| r.method == Method::Post).unwrap();
        assert_eq!(post.param_value("dateAdded"), Some("2022-04-20T00:00:00"));
    }

    #[tokio::test]
    async fn writes_need_admin() {
        let (app, _) = app(Canned::default().with(
            Method::Get,
            "/api/currentUser",
            json!({"user": {"email": "cgaucho@ucsb.edu"}, "roles": [{"authority": "ROLE_USER"}]}),
        ));
        let err = delete(&app, "articles", "1").await.unwrap_err();
        assert_eq!(err.to_string(), "delete requires the ROLE_ADMIN role");
        assert_eq!(whoami(&app).await.unwrap(), "cgaucho@ucsb.edu [ROLE_USER]");
    }

    #[tokio::test]
    async fn bad_input_is_rejected_early() {
        let (app, _) = app(Canned::default());
        assert!(create(&app, "articles", "[1, 2]").await.is_err());
        assert!(update(&app, "articles", "abc", "{}").await.is_err());
        let err = get(&app, "students", None, false).await.unwrap_err();
        assert_eq!(err.to_string(), "unknown resource 'students'");
    }

    #[test]
    fn long_cells_are_cut() {
        let long = "x".repeat(60);
        let text = cell(Some(&json!(long)));
        assert_eq!(text.chars().count(), MAX_CELL);
        assert!(text.ends_with("..."));
        assert_eq!(cell(None), "");
    }
}
