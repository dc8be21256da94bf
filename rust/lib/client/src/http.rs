//! reqwest-backed [`Transport`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use ucsb_core::ClientConfig;

use crate::{ApiError, Method, NoAuth, Request, Response, StaticToken, TokenSource, Transport};

/// Production transport: issues real HTTP requests against `origin`.
pub struct HttpTransport {
    http: reqwest::Client,
    origin: String,
    token_source: Arc<dyn TokenSource>,
}

impl HttpTransport {
    /// Build from configuration; a configured token becomes a
    /// [`StaticToken`], otherwise requests are anonymous.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let token_source: Arc<dyn TokenSource> = match &config.token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(NoAuth),
        };
        Self::with_token_source(config, token_source)
    }

    pub fn with_token_source(
        config: &ClientConfig,
        token_source: Arc<dyn TokenSource>,
    ) -> Result<Self, ApiError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            origin: config.origin().to_string(),
            token_source,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Build a request with auth header.
    async fn authed(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    /// Parse an API response, mapping HTTP errors to `ApiError`.
    async fn parse(resp: reqwest::Response) -> Result<Response, ApiError> {
        let status = resp.status();
        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: server_message(&text),
            });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) if is_json => return Err(ApiError::Decode(format!("response body: {e}"))),
                Err(_) => Value::String(text),
            }
        };
        Ok(Response::new(status.as_u16(), body))
    }
}

/// Prefer the `message` field of a JSON error body over the raw text.
fn server_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.to_string())
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.origin, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        tracing::debug!(method = %request.method, path = %request.path, "sending request");

        let mut builder = self.http.request(method, &url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let builder = self.authed(builder).await?;

        let result = match builder.send().await {
            Ok(resp) => Self::parse(resp).await,
            Err(e) => Err(ApiError::from(e)),
        };
        if let Err(e) = &result {
            tracing::warn!(method = %request.method, path = %request.path, error = %e, "request failed");
        }
        result
    }
}
