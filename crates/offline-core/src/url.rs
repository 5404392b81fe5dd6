//! Origin-qualified request URLs.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use url::{ParseError, Url};

/// Errors from URL parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("invalid URL {url}: {source}")]
    Invalid {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error("missing scheme: {0}")]
    MissingScheme(String),

    #[error("missing host: {0}")]
    MissingHost(String),

    #[error("invalid port in URL: {0}")]
    InvalidPort(String),
}

impl UrlError {
    fn from_parse(url: &str, source: ParseError) -> Self {
        match source {
            ParseError::RelativeUrlWithoutBase => Self::MissingScheme(url.to_string()),
            ParseError::EmptyHost => Self::MissingHost(url.to_string()),
            ParseError::InvalidPort => Self::InvalidPort(url.to_string()),
            source => Self::Invalid {
                url: url.to_string(),
                source,
            },
        }
    }
}

/// An absolute URL as the engine routes and keys it.
///
/// Parsing follows the WHATWG URL rules: hosts and schemes are lowercased,
/// dot segments are removed and default ports dropped. Fragments and empty
/// queries are discarded so two URLs naming the same resource compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestUrl(Url);

impl RequestUrl {
    /// Parse an absolute URL.
    pub fn parse(url: &str) -> Result<Self, UrlError> {
        let parsed = Url::parse(url.trim()).map_err(|e| UrlError::from_parse(url, e))?;
        Self::from_url(parsed, url)
    }

    /// Resolve a reference (absolute, protocol-relative, absolute-path or
    /// relative-path) against this URL.
    pub fn resolve(&self, reference: &str) -> Result<Self, UrlError> {
        let joined = self
            .0
            .join(reference.trim())
            .map_err(|e| UrlError::from_parse(reference, e))?;
        Self::from_url(joined, reference)
    }

    fn from_url(mut url: Url, raw: &str) -> Result<Self, UrlError> {
        if url.host_str().map_or(true, str::is_empty) {
            return Err(UrlError::MissingHost(raw.to_string()));
        }

        url.set_fragment(None);
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(Self(url))
    }

    /// URL scheme (lowercase).
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Host name (lowercase, IPv6 literals keep their brackets).
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Explicit non-default port.
    pub fn port(&self) -> Option<u16> {
        self.0.port()
    }

    /// Path component, always starting with `/`.
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Query string without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    /// `scheme://host[:port]`.
    pub fn origin(&self) -> String {
        self.0.origin().ascii_serialization()
    }

    /// Path plus query, as it appears after the origin.
    pub fn path_and_query(&self) -> String {
        match self.0.query() {
            Some(query) => format!("{}?{}", self.0.path(), query),
            None => self.0.path().to_string(),
        }
    }

    /// Whether both URLs share scheme, host and port.
    pub fn same_origin(&self, other: &RequestUrl) -> bool {
        self.0.origin() == other.0.origin()
    }

    /// The underlying parsed URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for RequestUrl {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RequestUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let url = RequestUrl::parse("HTTPS://App.Example.com/icons/a.png?v=2#top").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host(), "app.example.com");
        assert_eq!(url.port(), None);
        assert_eq!(url.path(), "/icons/a.png");
        assert_eq!(url.query(), Some("v=2"));
        assert_eq!(url.to_string(), "https://app.example.com/icons/a.png?v=2");
    }

    #[test]
    fn test_parse_removes_dot_segments() {
        let url = RequestUrl::parse("https://fittrack.app/icons/../api/profile").unwrap();
        assert_eq!(url.path(), "/api/profile");
        assert_eq!(url.to_string(), "https://fittrack.app/api/profile");

        let encoded = RequestUrl::parse("https://fittrack.app/icons/%2e%2e/api/profile").unwrap();
        assert_eq!(encoded, url);
    }

    #[test]
    fn test_default_port_dropped() {
        let a = RequestUrl::parse("https://example.com:443/").unwrap();
        let b = RequestUrl::parse("https://example.com").unwrap();
        assert_eq!(a, b);

        let c = RequestUrl::parse("http://localhost:3000").unwrap();
        assert_eq!(c.port(), Some(3000));
        assert_eq!(c.origin(), "http://localhost:3000");
    }

    #[test]
    fn test_empty_query_dropped() {
        let a = RequestUrl::parse("https://example.com/a?").unwrap();
        let b = RequestUrl::parse("https://example.com/a").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.query(), None);
    }

    #[test]
    fn test_ipv6_host() {
        let url = RequestUrl::parse("http://[::1]:8080/x").unwrap();
        assert_eq!(url.host(), "[::1]");
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            RequestUrl::parse("/relative"),
            Err(UrlError::MissingScheme(_))
        ));
        assert!(matches!(
            RequestUrl::parse("mailto:coach@fittrack.app"),
            Err(UrlError::MissingHost(_))
        ));
        assert!(matches!(
            RequestUrl::parse("https://host:http/"),
            Err(UrlError::InvalidPort(_))
        ));
        assert!(matches!(
            RequestUrl::parse("https://exa mple.com/"),
            Err(UrlError::Invalid { .. })
        ));
    }

    #[test]
    fn test_resolve_references() {
        let base = RequestUrl::parse("https://app.example.com/styles/main.css").unwrap();

        assert_eq!(
            base.resolve("/manifest.json").unwrap().to_string(),
            "https://app.example.com/manifest.json"
        );
        assert_eq!(
            base.resolve("standalone.css").unwrap().to_string(),
            "https://app.example.com/styles/standalone.css"
        );
        assert_eq!(
            base.resolve("../icons/a.png").unwrap().to_string(),
            "https://app.example.com/icons/a.png"
        );
        assert_eq!(
            base.resolve("//cdn.example.net/x.js").unwrap().to_string(),
            "https://cdn.example.net/x.js"
        );
        assert_eq!(
            base.resolve("https://accounts.google.com/o/oauth2").unwrap().host(),
            "accounts.google.com"
        );
    }

    #[test]
    fn test_same_origin() {
        let a = RequestUrl::parse("https://app.example.com/a").unwrap();
        let b = RequestUrl::parse("https://app.example.com/b?c=d").unwrap();
        let c = RequestUrl::parse("http://app.example.com/a").unwrap();
        let d = RequestUrl::parse("https://app.example.com:8443/a").unwrap();
        assert!(a.same_origin(&b));
        assert!(!a.same_origin(&c));
        assert!(!a.same_origin(&d));
    }

    #[test]
    fn test_serde_as_string() {
        let url = RequestUrl::parse("https://app.example.com/install.html").unwrap();
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, r#""https://app.example.com/install.html""#);

        let back: RequestUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);
    }
}
