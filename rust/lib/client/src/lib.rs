//! HTTP transport for the UCSB resource API.
//!
//! Every read and write in the application goes through a [`Transport`].
//! Production code uses [`HttpTransport`] (reqwest); tests substitute a
//! scripted implementation. Authentication is supplied by a pluggable
//! [`TokenSource`].
//!
//! # Usage
//!
//! ```ignore
//! use ucsb_client::{HttpTransport, Request, Transport};
//!
//! let transport = HttpTransport::new(&config)?;
//! let resp = transport.send(Request::get("/api/articles/all")).await?;
//! ```

pub mod error;
pub mod http;
pub mod request;
pub mod token;

pub use error::ApiError;
pub use http::HttpTransport;
pub use request::{Method, Request, Response, cache_key};
pub use token::{NoAuth, StaticToken, TokenSource};

/// Issues one request against the backend.
///
/// Implementations must be shareable across tasks; the cache layer holds
/// them behind an `Arc`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: Request) -> Result<Response, ApiError>;
}
