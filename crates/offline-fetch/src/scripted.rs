//! Deterministic network for tests and simulation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use offline_core::{Request, RequestIdentity, RequestUrl, Response, ResponseKind};

use crate::client::{FetchError, Fetcher};

/// A network that answers from a fixed table of URL → response.
///
/// Unknown URLs answer 404. The network can be switched offline, single
/// URLs can be made to fail, and every attempted request is recorded.
///
/// A network built with [`ScriptedNetwork::for_origin`] classifies the
/// responses it serves: anything left as `basic` becomes `opaque` when the
/// request leaves the app origin. Explicit `cors`, `opaque` or `error`
/// kinds are kept.
pub struct ScriptedNetwork {
    origin: Option<RequestUrl>,
    responses: RwLock<HashMap<String, Response>>,
    failing: RwLock<HashSet<String>>,
    online: AtomicBool,
    latency: Option<Duration>,
    log: Mutex<Vec<RequestIdentity>>,
}

impl Default for ScriptedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedNetwork {
    /// Create an online network with no scripted responses.
    pub fn new() -> Self {
        Self {
            origin: None,
            responses: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            online: AtomicBool::new(true),
            latency: None,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Create an online network serving the app at `origin`.
    pub fn for_origin(origin: &RequestUrl) -> Self {
        Self {
            origin: Some(origin.clone()),
            ..Self::new()
        }
    }

    /// Script a response for a URL.
    pub fn with_response(self, url: &str, response: Response) -> Self {
        self.set_response(url, response);
        self
    }

    /// Make a URL fail with a connection error.
    pub fn with_failure(self, url: &str) -> Self {
        self.fail(url);
        self
    }

    /// Delay every attempt.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Script or replace the response for a URL.
    pub fn set_response(&self, url: &str, response: Response) {
        self.responses
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(normalize(url), response);
    }

    /// Make a URL fail with a connection error.
    pub fn fail(&self, url: &str) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(normalize(url));
    }

    /// Stop failing a URL.
    pub fn heal(&self, url: &str) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&normalize(url));
    }

    /// Switch the whole network on or off.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Whether the network is reachable.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Every request attempted so far, in order.
    pub fn requests(&self) -> Vec<RequestIdentity> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of attempts made for a URL.
    pub fn request_count(&self, url: &str) -> usize {
        let url = normalize(url);
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|identity| identity.url() == url)
            .count()
    }

    /// Forget recorded requests.
    pub fn clear_log(&self) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl Fetcher for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.url().to_string();
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.identity());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if !self.is_online() {
            return Err(FetchError::Offline(url));
        }

        let failing = self
            .failing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&url);
        if failing {
            return Err(FetchError::Connection(format!("connection reset: {}", url)));
        }

        let scripted = self
            .responses
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&url)
            .cloned();

        let mut response = match scripted {
            Some(response) if response.url.is_some() => response,
            Some(response) => response.with_url(url),
            None => Response::new(404)
                .with_content_type("text/plain")
                .with_body("Not Found")
                .with_url(url),
        };

        if let Some(origin) = &self.origin {
            if response.kind == ResponseKind::Basic {
                response.kind = ResponseKind::for_origin(request.url().same_origin(origin));
            }
        }

        Ok(response)
    }
}

fn normalize(url: &str) -> String {
    RequestUrl::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> Request {
        Request::get(RequestUrl::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_scripted_response() {
        let network = ScriptedNetwork::new()
            .with_response("https://fittrack.app/manifest.json", Response::ok("{}"));

        let response = network.fetch(&get("https://fittrack.app/manifest.json")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.url.as_deref(), Some("https://fittrack.app/manifest.json"));
    }

    #[tokio::test]
    async fn test_unknown_url_is_404_not_error() {
        let network = ScriptedNetwork::new();
        let response = network.fetch(&get("https://fittrack.app/nope")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_offline() {
        let network = ScriptedNetwork::new()
            .with_response("https://fittrack.app/", Response::ok("root"));
        network.set_online(false);

        let err = network.fetch(&get("https://fittrack.app/")).await.unwrap_err();
        assert!(matches!(err, FetchError::Offline(_)));

        network.set_online(true);
        assert!(network.fetch(&get("https://fittrack.app/")).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_url() {
        let network = ScriptedNetwork::new().with_failure("https://fittrack.app/favicon.ico");
        let err = network.fetch(&get("https://fittrack.app/favicon.ico")).await.unwrap_err();
        assert!(matches!(err, FetchError::Connection(_)));

        network.heal("https://fittrack.app/favicon.ico");
        let response = network.fetch(&get("https://fittrack.app/favicon.ico")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_origin_classifies_response_kind() {
        let origin = RequestUrl::parse("https://fittrack.app").unwrap();
        let network = ScriptedNetwork::for_origin(&origin)
            .with_response("https://fittrack.app/app.js", Response::ok("app"))
            .with_response("https://cdn.example.net/lib.js", Response::ok("lib"))
            .with_response(
                "https://api.example.net/plans",
                Response::ok("[]").with_kind(ResponseKind::Cors),
            );

        let same = network.fetch(&get("https://fittrack.app/app.js")).await.unwrap();
        assert_eq!(same.kind, ResponseKind::Basic);

        let cross = network.fetch(&get("https://cdn.example.net/lib.js")).await.unwrap();
        assert_eq!(cross.kind, ResponseKind::Opaque);

        let cors = network.fetch(&get("https://api.example.net/plans")).await.unwrap();
        assert_eq!(cors.kind, ResponseKind::Cors);
    }

    #[tokio::test]
    async fn test_without_origin_kind_is_untouched() {
        let network = ScriptedNetwork::new()
            .with_response("https://cdn.example.net/lib.js", Response::ok("lib"));
        let response = network.fetch(&get("https://cdn.example.net/lib.js")).await.unwrap();
        assert_eq!(response.kind, ResponseKind::Basic);
    }

    #[tokio::test]
    async fn test_request_log() {
        let network = ScriptedNetwork::new();
        network.fetch(&get("https://fittrack.app/a")).await.unwrap();
        network.fetch(&get("https://fittrack.app/a")).await.unwrap();
        network.set_online(false);
        let _ = network.fetch(&get("https://fittrack.app/b")).await;

        assert_eq!(network.requests().len(), 3);
        assert_eq!(network.request_count("https://fittrack.app/a"), 2);
        assert_eq!(network.request_count("https://fittrack.app/b"), 1);

        network.clear_log();
        assert!(network.requests().is_empty());
    }
}
