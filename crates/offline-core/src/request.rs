//! Intercepted requests and their cache identity.

use std::collections::BTreeMap;
use std::fmt;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::url::RequestUrl;

/// Request headers, keyed by lowercase name.
pub type Headers = BTreeMap<String, String>;

/// A request issued by the host application and seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: RequestUrl,
    headers: Headers,
}

impl Request {
    /// Create a request.
    pub fn new(method: Method, url: RequestUrl) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
        }
    }

    /// Create a `GET` request.
    pub fn get(url: RequestUrl) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a top-level navigation, which declares that it accepts HTML.
    pub fn navigate(url: RequestUrl) -> Self {
        Self::get(url).with_header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Same method and headers, addressed to another URL.
    pub fn retarget(&self, url: RequestUrl) -> Self {
        Self {
            method: self.method.clone(),
            url,
            headers: self.headers.clone(),
        }
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL.
    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    /// All headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Host the request is addressed to.
    pub fn host(&self) -> &str {
        self.url.host()
    }

    /// Request path.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Whether the `Accept` header lists `text/html`.
    pub fn accepts_html(&self) -> bool {
        self.header("accept")
            .map(|accept| {
                accept
                    .split(',')
                    .any(|part| part.trim().to_ascii_lowercase().starts_with("text/html"))
            })
            .unwrap_or(false)
    }

    /// Cache identity of this request.
    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity::new(&self.method, &self.url)
    }
}

/// Key under which a response is cached: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestIdentity {
    method: String,
    url: String,
}

impl RequestIdentity {
    /// Build the identity for a method and URL.
    pub fn new(method: &Method, url: &RequestUrl) -> Self {
        Self {
            method: method.as_str().to_string(),
            url: url.to_string(),
        }
    }

    /// Identity of a `GET` for a URL.
    pub fn get(url: &RequestUrl) -> Self {
        Self::new(&Method::GET, url)
    }

    /// Method part of the identity.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// URL part of the identity.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the identity names a `GET` request.
    pub fn is_get(&self) -> bool {
        self.method == Method::GET.as_str()
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> RequestUrl {
        RequestUrl::parse(s).unwrap()
    }

    #[test]
    fn test_accepts_html() {
        let nav = Request::navigate(url("https://app.example.com/"));
        assert!(nav.accepts_html());

        let json = Request::get(url("https://app.example.com/missing.json"))
            .with_header("Accept", "application/json");
        assert!(!json.accepts_html());

        let bare = Request::get(url("https://app.example.com/"));
        assert!(!bare.accepts_html());
    }

    #[test]
    fn test_header_case_insensitive() {
        let req = Request::get(url("https://app.example.com/")).with_header("X-Client", "pwa");
        assert_eq!(req.header("x-client"), Some("pwa"));
        assert_eq!(req.header("X-CLIENT"), Some("pwa"));
    }

    #[test]
    fn test_identity() {
        let req = Request::get(url("https://app.example.com/icons/a.png"));
        let id = req.identity();
        assert_eq!(id.to_string(), "GET https://app.example.com/icons/a.png");
        assert!(id.is_get());

        let post = Request::new(Method::POST, url("https://app.example.com/api/meals"));
        assert!(!post.identity().is_get());
        assert_ne!(post.identity(), RequestIdentity::get(post.url()));
    }

    #[test]
    fn test_retarget_keeps_method_and_headers() {
        let req = Request::navigate(url("https://app.example.com/install"));
        let canonical = req.retarget(url("https://app.example.com/install.html"));
        assert_eq!(canonical.path(), "/install.html");
        assert!(canonical.accepts_html());
        assert_eq!(canonical.method(), &Method::GET);
    }

    #[test]
    fn test_identity_ignores_fragment() {
        let a = Request::get(url("https://app.example.com/#/workouts")).identity();
        let b = Request::get(url("https://app.example.com/")).identity();
        assert_eq!(a, b);
    }
}
