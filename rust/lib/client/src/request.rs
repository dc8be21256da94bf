use std::fmt;

use serde_json::Value;

/// HTTP verbs the resource API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backend call: method, path relative to the origin, query
/// parameters and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Query parameters in the order they were added.
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), params: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the first query parameter named `name`.
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Cache key identifying what this request reads.
    pub fn cache_key(&self) -> String {
        cache_key(&self.path, &self.params)
    }
}

/// Stable key for `(path, params)`: parameters are sorted by name so the
/// same resource always maps to the same key. Names and values are
/// percent-encoded, so `&` or `=` inside a value cannot mimic another
/// parameter.
///
/// ```
/// use ucsb_client::cache_key;
///
/// assert_eq!(cache_key("/api/articles/all", &[]), "/api/articles/all");
/// assert_eq!(
///     cache_key("/api/recommendationrequest", &[("id".into(), "17".into())]),
///     "/api/recommendationrequest?id=17"
/// );
/// ```
pub fn cache_key(path: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    let query: Vec<String> = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("{path}?{}", query.join("&"))
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Parsed JSON body. Plain-text bodies arrive as a JSON string and an
    /// empty body as `null`.
    pub body: Value,
}

impl Response {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_key_sorts_params() {
        let a = Request::get("/api/x").param("b", "2").param("a", "1");
        let b = Request::get("/api/x").param("a", "1").param("b", "2");
        assert_eq!(a.cache_key(), "/api/x?a=1&b=2");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn cache_key_encodes_separators() {
        let packed = Request::get("/api/x").param("a", "1&b=2");
        let split = Request::get("/api/x").param("a", "1").param("b", "2");
        assert_ne!(packed.cache_key(), split.cache_key());
        assert_eq!(packed.cache_key(), "/api/x?a=1%26b%3D2");

        let key = cache_key("/api/ucsbdiningcommonsmenuitem", &[("station".into(), "Grill (Cafe)".into())]);
        assert_eq!(key, "/api/ucsbdiningcommonsmenuitem?station=Grill%20%28Cafe%29");
        assert_eq!(cache_key("/api/x", &[("id".into(), "a-b_c.d".into())]), "/api/x?id=a-b_c.d");
    }

    #[test]
    fn builder() {
        let req = Request::put("/api/ucsborganization")
            .param("orgCode", "ZPR")
            .json(json!({"inactive": false}));
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.param_value("orgCode"), Some("ZPR"));
        assert_eq!(req.param_value("id"), None);
        assert_eq!(req.body, Some(json!({"inactive": false})));
        assert_eq!(req.method.to_string(), "PUT");
    }
}
