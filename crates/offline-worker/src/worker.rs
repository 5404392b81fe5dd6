//! The service worker facade.

use std::sync::{Arc, RwLock};

use offline_cache::{should_include_debug_headers, CacheExplainHeaders, CacheStorage};
use offline_core::{EngineConfig, Generation, Request, RequestId, RequestUrl, Response, WorkerState};
use offline_executor::{Outcome, StrategyExecutor};
use offline_fetch::{FetchError, Fetcher, TimeoutConfig, TimeoutFetcher};
use offline_observability::{EngineMetrics, MetricsSnapshot, StructuredLogger};
use offline_router::{RouteDecision, RouteTable};

use crate::error::WorkerError;
use crate::messaging::{ClientCommand, ClientHandle, ClientRegistry};

/// One deployed version of the offline engine.
///
/// A worker owns a single cache generation. It seeds that generation on
/// install, purges every other generation on activate, and from then on
/// answers intercepted requests through the route table.
pub struct ServiceWorker {
    pub(crate) config: EngineConfig,
    pub(crate) generation: Generation,
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) routes: RouteTable,
    pub(crate) root_document: RequestUrl,
    pub(crate) state: RwLock<WorkerState>,
    pub(crate) executor: RwLock<Option<Arc<StrategyExecutor>>>,
    pub(crate) clients: ClientRegistry,
    pub(crate) metrics: Arc<EngineMetrics>,
}

impl ServiceWorker {
    /// Create a worker over a storage backend and a network.
    ///
    /// The network is wrapped in the configured transport timeout.
    pub fn new(
        config: EngineConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, WorkerError> {
        config.validate()?;

        let routes = RouteTable::from_config(&config)?;
        let root_document = config.root_url()?;
        let timeout = TimeoutConfig::from_total(config.fetch_timeout());
        let fetcher: Arc<dyn Fetcher> = Arc::new(TimeoutFetcher::new(fetcher, timeout));

        Ok(Self {
            generation: config.generation.clone(),
            config,
            storage,
            fetcher,
            routes,
            root_document,
            state: RwLock::new(WorkerState::Parsed),
            executor: RwLock::new(None),
            clients: ClientRegistry::default(),
            metrics: Arc::new(EngineMetrics::new()),
        })
    }

    /// Share a client registry with a previous worker so open views carry over.
    pub fn with_clients(mut self, clients: ClientRegistry) -> Self {
        self.clients = clients;
        self
    }

    /// Configuration the worker was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generation this worker owns.
    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Route table used for intercepted requests.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Storage backend holding every generation.
    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Open views.
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Open a new view.
    pub fn connect(&self) -> ClientHandle {
        self.clients.connect()
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Decide how a request would be handled, without running it.
    pub fn route(&self, request: &Request) -> RouteDecision {
        self.routes.route(request)
    }

    /// Answer an intercepted request.
    pub async fn handle_fetch(&self, request: Request) -> Result<Response, FetchError> {
        self.fetch_outcome(request).await.map(Outcome::into_response)
    }

    /// Answer an intercepted request and report where the response came from.
    ///
    /// Until the worker is activated requests are not controlled and go
    /// straight to the network.
    pub async fn fetch_outcome(&self, request: Request) -> Result<Outcome, FetchError> {
        self.metrics.record_request();

        let executor = self
            .executor
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|_| self.state().controls_requests());

        let Some(executor) = executor else {
            let response = self.fetcher.fetch(&request).await?;
            self.metrics.record_bypass();
            return Ok(Outcome::bypass(response));
        };

        let decision = self.routes.route(&request);
        let logger = self.logger(RequestId::generate())
            .with_rule(decision.rule)
            .with_url(request.url().to_string());

        let outcome = executor.execute(&request, &decision, &logger).await?;

        if self.config.debug_headers || should_include_debug_headers(&request) {
            let explain = CacheExplainHeaders::new()
                .with_status(outcome.status)
                .with_generation(&self.generation)
                .with_rule(decision.rule);
            return Ok(Outcome {
                response: explain.apply(outcome.response),
                status: outcome.status,
            });
        }

        Ok(outcome)
    }

    /// Relay a view's command to every open view. Returns how many views
    /// received the reply.
    pub fn handle_message(&self, command: ClientCommand) -> usize {
        let event = command.reply();
        let delivered = self.clients.broadcast(event);

        self.logger(RequestId::generate())
            .debug_builder("client message")
            .field("command", format!("{:?}", command))
            .field("event", event.to_json())
            .field_u64("delivered", delivered as u64)
            .emit();

        delivered
    }

    /// Decode and relay a JSON command payload.
    pub fn handle_message_json(&self, payload: &str) -> Result<usize, WorkerError> {
        let command = ClientCommand::from_json(payload)?;
        Ok(self.handle_message(command))
    }

    pub(crate) fn logger(&self, request_id: RequestId) -> StructuredLogger {
        StructuredLogger::new(request_id)
            .with_generation(&self.generation)
            .with_format(self.config.log_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_cache::{header_names, CacheStatus, InMemoryStorage};
    use offline_fetch::ScriptedNetwork;

    fn network(config: &EngineConfig) -> Arc<ScriptedNetwork> {
        let network = ScriptedNetwork::new();
        for url in config.seed_urls().unwrap() {
            network.set_response(&url.to_string(), Response::ok(url.path().to_string()));
        }
        Arc::new(network)
    }

    fn config() -> EngineConfig {
        EngineConfig {
            generation: Generation::from("fitness-cache-test"),
            ..Default::default()
        }
    }

    fn url(path: &str) -> RequestUrl {
        RequestUrl::parse(&format!("https://fittrack.app{}", path)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            generation: Generation::from(""),
            ..Default::default()
        };
        let result = ServiceWorker::new(
            config.clone(),
            Arc::new(InMemoryStorage::new()),
            network(&EngineConfig::default()),
        );
        assert!(matches!(result, Err(WorkerError::Config(_))));
    }

    #[tokio::test]
    async fn test_uncontrolled_before_activation() {
        let config = config();
        let net = network(&config);
        let worker =
            ServiceWorker::new(config, Arc::new(InMemoryStorage::new()), net.clone()).unwrap();

        let outcome = worker.fetch_outcome(Request::get(url("/icons/icon-192x192.png"))).await.unwrap();
        assert_eq!(outcome.status, CacheStatus::Bypass);
        assert_eq!(worker.state(), WorkerState::Parsed);
        assert!(worker.storage().list_generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_debug_header_opt_in() {
        let config = config();
        let net = network(&config);
        let worker =
            ServiceWorker::new(config, Arc::new(InMemoryStorage::new()), net).unwrap();
        worker.start().await.unwrap();

        let plain = worker.handle_fetch(Request::get(url("/favicon.ico"))).await.unwrap();
        assert_eq!(plain.header(header_names::X_CACHE_STATUS), None);

        let debug = worker
            .handle_fetch(Request::get(url("/favicon.ico")).with_header("X-Debug-Cache", "1"))
            .await
            .unwrap();
        assert_eq!(debug.header(header_names::X_CACHE_STATUS), Some("HIT"));
        assert_eq!(debug.header(header_names::X_CACHE_RULE), Some("default"));
        assert_eq!(
            debug.header(header_names::X_CACHE_GENERATION),
            Some("fitness-cache-test")
        );
    }

    #[tokio::test]
    async fn test_debug_headers_from_config() {
        let config = EngineConfig {
            debug_headers: true,
            ..config()
        };
        let net = network(&config);
        let worker =
            ServiceWorker::new(config, Arc::new(InMemoryStorage::new()), net).unwrap();
        worker.start().await.unwrap();

        let response = worker
            .handle_fetch(Request::get(url("/icons/icon-512x512.png")))
            .await
            .unwrap();
        assert_eq!(response.header(header_names::X_CACHE_RULE), Some("static-assets"));
    }

    #[tokio::test]
    async fn test_message_relay() {
        let config = config();
        let net = network(&config);
        let worker =
            ServiceWorker::new(config, Arc::new(InMemoryStorage::new()), net).unwrap();

        assert_eq!(worker.handle_message(ClientCommand::PromptInstall), 0);

        let mut view = worker.connect();
        let delivered = worker
            .handle_message_json(r#"{"type":"STANDALONE_MODE"}"#)
            .unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(
            view.recv().await.unwrap(),
            crate::messaging::ClientEvent::ApplyStandaloneStyles
        );

        assert!(matches!(
            worker.handle_message_json(r#"{"type":"NOPE"}"#),
            Err(WorkerError::Message(_))
        ));
    }
}
