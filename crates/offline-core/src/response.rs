//! Response snapshots as served to callers and held in the cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Origin classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response.
    #[default]
    Basic,
    /// Cross-origin response with CORS headers exposed.
    Cors,
    /// Cross-origin response without CORS; status and body are hidden.
    Opaque,
    /// Network error placeholder.
    Error,
}

impl ResponseKind {
    /// Classify a response by comparing the request's origin to the app origin.
    pub fn for_origin(same_origin: bool) -> Self {
        if same_origin {
            Self::Basic
        } else {
            Self::Opaque
        }
    }
}

/// A response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Declared content type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Origin classification.
    #[serde(default)]
    pub kind: ResponseKind,
    /// Whether the response followed a redirect.
    #[serde(default)]
    pub redirected: bool,
    /// Final URL the response was served from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Additional headers, keyed by lowercase name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Response body.
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Response {
    /// Create an empty same-origin response with a status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            kind: ResponseKind::Basic,
            redirected: false,
            url: None,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Create a 200 response with a body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200).with_body(body)
    }

    /// Create an opaque cross-origin response (status 0, no body).
    pub fn opaque() -> Self {
        Self {
            kind: ResponseKind::Opaque,
            ..Self::new(0)
        }
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the origin classification.
    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the final URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Mark the response as redirected.
    pub fn with_redirected(mut self, redirected: bool) -> Self {
        self.redirected = redirected;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Typed status code, if the status is a valid HTTP code.
    pub fn status_code(&self) -> Option<http::StatusCode> {
        http::StatusCode::from_u16(self.status).ok()
    }

    /// Status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Eligible for passive caching: exactly 200, same-origin and not redirected.
    pub fn is_passively_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic && !self.redirected
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
