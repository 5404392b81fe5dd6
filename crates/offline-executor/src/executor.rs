//! Strategy execution against one store and one network.

use std::sync::Arc;
use std::time::Instant;

use offline_cache::{CacheStatus, Store, WritePolicy};
use offline_core::{Request, RequestIdentity, RequestUrl, Response};
use offline_fetch::{FetchError, Fetcher};
use offline_observability::{EngineMetrics, StructuredLogger};
use offline_router::{RouteDecision, StrategyTag};

use crate::fallback::FallbackStrategy;
use crate::outcome::Outcome;

/// Runs caching strategies for the current generation.
///
/// Each strategy makes at most one network attempt. Cache reads that fail
/// count as misses and cache writes that fail are logged and dropped; only
/// network failures without a usable fallback reach the caller.
pub struct StrategyExecutor {
    store: Store,
    fetcher: Arc<dyn Fetcher>,
    root_document: RequestUrl,
    metrics: Arc<EngineMetrics>,
}

impl StrategyExecutor {
    /// Create an executor over a store, a network and the offline root document.
    pub fn new(store: Store, fetcher: Arc<dyn Fetcher>, root_document: RequestUrl) -> Self {
        Self {
            store,
            fetcher,
            root_document,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Share metrics with the owning worker.
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Store the executor reads and writes.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Metrics the executor records into.
    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    /// Run the strategy selected by `decision`.
    pub async fn execute(
        &self,
        request: &Request,
        decision: &RouteDecision,
        logger: &StructuredLogger,
    ) -> Result<Outcome, FetchError> {
        let outcome = match decision.strategy {
            StrategyTag::Bypass => self.bypass(request, logger).await,
            StrategyTag::CanonicalCopy => {
                let canonical = decision
                    .canonical
                    .clone()
                    .unwrap_or_else(|| request.url().clone());
                self.canonical_copy(request, canonical, logger).await
            }
            StrategyTag::CacheFirst => self.cache_first(request, logger).await,
            StrategyTag::NetworkFirst => self.network_first(request, logger).await,
            StrategyTag::CacheThenNetwork => self.cache_then_network(request, logger).await,
        }?;

        self.record(outcome.status);
        logger
            .debug_builder("served")
            .field("status", outcome.status)
            .field_u64("http_status", u64::from(outcome.response.status))
            .emit();

        Ok(outcome)
    }

    /// Forward to the network untouched. The store is never consulted.
    pub async fn bypass(
        &self,
        request: &Request,
        logger: &StructuredLogger,
    ) -> Result<Outcome, FetchError> {
        self.network(request, logger).await.map(Outcome::bypass)
    }

    /// Serve the stored canonical page for an alias path.
    ///
    /// On a miss the canonical URL is fetched and returned without storing.
    pub async fn canonical_copy(
        &self,
        request: &Request,
        canonical: RequestUrl,
        logger: &StructuredLogger,
    ) -> Result<Outcome, FetchError> {
        let canonical = request.retarget(canonical);

        if let Some(cached) = self.lookup(&canonical.identity(), logger).await {
            return Ok(Outcome::hit(cached));
        }

        self.network(&canonical, logger).await.map(Outcome::miss)
    }

    /// Stored copy if present, otherwise the network. Never stores.
    pub async fn cache_first(
        &self,
        request: &Request,
        logger: &StructuredLogger,
    ) -> Result<Outcome, FetchError> {
        if let Some(cached) = self.lookup(&request.identity(), logger).await {
            return Ok(Outcome::hit(cached));
        }

        self.network(request, logger).await.map(Outcome::miss)
    }

    /// Network first, refreshing the stored copy on success.
    ///
    /// Non-ok responses are returned without touching the store. On a
    /// network failure the stored copy is served instead, if there is one.
    pub async fn network_first(
        &self,
        request: &Request,
        logger: &StructuredLogger,
    ) -> Result<Outcome, FetchError> {
        let identity = request.identity();

        match self.network(request, logger).await {
            Ok(response) => {
                self.store_copy(&identity, &response, WritePolicy::Refresh, logger)
                    .await;
                Ok(Outcome::network(response))
            }
            Err(error) => {
                let strategy = FallbackStrategy::for_request(StrategyTag::NetworkFirst, request);
                self.fallback(strategy, request, error, logger).await
            }
        }
    }

    /// Stored copy if present, otherwise the network, caching eligible
    /// responses. HTML requests fall back to the root document when the
    /// network fails.
    pub async fn cache_then_network(
        &self,
        request: &Request,
        logger: &StructuredLogger,
    ) -> Result<Outcome, FetchError> {
        let identity = request.identity();

        if let Some(cached) = self.lookup(&identity, logger).await {
            return Ok(Outcome::hit(cached));
        }

        match self.network(request, logger).await {
            Ok(response) => {
                self.store_copy(&identity, &response, WritePolicy::Passive, logger)
                    .await;
                Ok(Outcome::miss(response))
            }
            Err(error) => {
                let strategy = FallbackStrategy::for_request(StrategyTag::CacheThenNetwork, request);
                self.fallback(strategy, request, error, logger).await
            }
        }
    }

    async fn fallback(
        &self,
        strategy: FallbackStrategy,
        request: &Request,
        error: FetchError,
        logger: &StructuredLogger,
    ) -> Result<Outcome, FetchError> {
        let identity = match strategy {
            FallbackStrategy::Propagate => return Err(error),
            FallbackStrategy::CachedCopy => request.identity(),
            FallbackStrategy::RootDocument => RequestIdentity::get(&self.root_document),
        };

        match self.lookup(&identity, logger).await {
            Some(cached) => {
                logger
                    .info_builder("network failed, serving cached copy")
                    .field("error", &error)
                    .field("fallback", &identity)
                    .emit();
                Ok(Outcome::fallback(cached))
            }
            None => Err(error),
        }
    }

    async fn lookup(
        &self,
        identity: &RequestIdentity,
        logger: &StructuredLogger,
    ) -> Option<Response> {
        match self.store.get(identity).await {
            Ok(found) => found,
            Err(e) => {
                logger
                    .warn_builder("cache read failed, treating as miss")
                    .field("identity", identity)
                    .field("error", e)
                    .emit();
                None
            }
        }
    }

    async fn store_copy(
        &self,
        identity: &RequestIdentity,
        response: &Response,
        policy: WritePolicy,
        logger: &StructuredLogger,
    ) {
        if !policy.admits(response) {
            return;
        }

        if let Err(e) = self.store.put(identity, response).await {
            self.metrics.record_cache_write_failure();
            logger
                .warn_builder("cache write failed")
                .field("identity", identity)
                .field("error", e)
                .emit();
        }
    }

    async fn network(
        &self,
        request: &Request,
        logger: &StructuredLogger,
    ) -> Result<Response, FetchError> {
        let started = Instant::now();
        let result = self.fetcher.fetch(request).await;
        self.metrics.record_network_time(started.elapsed());

        if let Err(e) = &result {
            self.metrics.record_network_failure();
            logger
                .warn_builder("network request failed")
                .field("url", request.url())
                .field("error", e)
                .emit();
        }

        result
    }

    fn record(&self, status: CacheStatus) {
        match status {
            CacheStatus::Hit => self.metrics.record_hit(),
            CacheStatus::Miss => self.metrics.record_miss(),
            CacheStatus::Network => self.metrics.record_network(),
            CacheStatus::Fallback => self.metrics.record_fallback(),
            CacheStatus::Bypass => self.metrics.record_bypass(),
        }
    }
}
