//! Install and activate.

use std::sync::Arc;

use futures::future::join_all;
use offline_cache::WritePolicy;
use offline_core::{Generation, Request, RequestId, WorkerState};
use offline_executor::StrategyExecutor;
use serde::Serialize;

use crate::error::WorkerError;
use crate::worker::ServiceWorker;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Generation that was seeded.
    pub generation: Generation,
    /// Entries stored.
    pub entries: usize,
    /// Whether the worker asks to activate without waiting for old views
    /// to close.
    pub skip_waiting: bool,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Generation now serving requests.
    pub generation: Generation,
    /// Stale generations that were removed.
    pub deleted: Vec<Generation>,
    /// Open views now controlled by this worker.
    pub claimed: usize,
}

impl ServiceWorker {
    /// Seed this worker's generation.
    ///
    /// Every seed URL is fetched concurrently and must answer with an ok
    /// status; nothing is stored until all of them have. On any failure the
    /// generation is deleted and the worker becomes redundant.
    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        self.transition(WorkerState::Installing)?;
        let logger = self.logger(RequestId::generate());

        match self.seed().await {
            Ok(entries) => {
                self.transition(WorkerState::Installed)?;
                self.metrics.record_seeded(entries as u64);
                logger
                    .info_builder("install complete")
                    .field_u64("entries", entries as u64)
                    .emit();

                Ok(InstallReport {
                    generation: self.generation.clone(),
                    entries,
                    skip_waiting: true,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete_generation(&self.generation).await {
                    logger
                        .warn_builder("failed to delete partial generation")
                        .field("error", cleanup)
                        .emit();
                }
                self.set_state(WorkerState::Redundant);
                logger.error_builder("install failed").field("error", &e).emit();
                Err(e)
            }
        }
    }

    async fn seed(&self) -> Result<usize, WorkerError> {
        let store = self.storage.open(&self.generation).await?;
        let requests: Vec<Request> = self
            .config
            .seed_urls()?
            .into_iter()
            .map(Request::get)
            .collect();

        let results = join_all(requests.iter().map(|r| self.fetcher.fetch(r))).await;

        let mut fetched = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(results) {
            let response = result.map_err(|source| WorkerError::SeedFetch {
                url: request.url().to_string(),
                source,
            })?;

            if !WritePolicy::Seed.admits(&response) {
                return Err(WorkerError::SeedStatus {
                    url: request.url().to_string(),
                    status: response.status,
                });
            }

            fetched.push((request.identity(), response));
        }

        for (identity, response) in &fetched {
            store.put(identity, response).await?;
        }

        Ok(fetched.len())
    }

    /// Make this worker's generation the only one and take control of
    /// every open view.
    ///
    /// A failed activation leaves the worker installed so it can be retried.
    pub async fn activate(&self) -> Result<ActivateReport, WorkerError> {
        self.transition(WorkerState::Activating)?;

        match self.take_over().await {
            Ok(deleted) => {
                let claimed = self.clients.claim(&self.generation);
                self.transition(WorkerState::Activated)?;
                self.metrics.record_generations_deleted(deleted.len() as u64);

                self.logger(RequestId::generate())
                    .info_builder("activated")
                    .field_u64("deleted", deleted.len() as u64)
                    .field_u64("claimed", claimed as u64)
                    .emit();

                Ok(ActivateReport {
                    generation: self.generation.clone(),
                    deleted,
                    claimed,
                })
            }
            Err(e) => {
                self.set_state(WorkerState::Installed);
                Err(e)
            }
        }
    }

    async fn take_over(&self) -> Result<Vec<Generation>, WorkerError> {
        let deleted = self.purge().await?;

        let store = self.storage.open(&self.generation).await?;
        let executor = StrategyExecutor::new(
            store,
            Arc::clone(&self.fetcher),
            self.root_document.clone(),
        )
        .with_metrics(Arc::clone(&self.metrics));
        *self.executor.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(executor));

        Ok(deleted)
    }

    async fn purge(&self) -> Result<Vec<Generation>, WorkerError> {
        let mut deleted = Vec::new();
        for generation in self.storage.list_generations().await? {
            if generation != self.generation && self.storage.delete_generation(&generation).await? {
                deleted.push(generation);
            }
        }
        Ok(deleted)
    }

    /// Install, then activate straight away.
    pub async fn start(&self) -> Result<(InstallReport, ActivateReport), WorkerError> {
        let installed = self.install().await?;
        let activated = self.activate().await?;
        Ok((installed, activated))
    }

    fn transition(&self, next: WorkerState) -> Result<(), WorkerError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if !state.can_transition_to(next) {
            return Err(WorkerError::InvalidTransition {
                from: *state,
                to: next,
            });
        }
        let from = *state;
        tracing::debug!(target: "offline", from = %from, to = %next, "worker state change");
        *state = next;
        Ok(())
    }

    fn set_state(&self, next: WorkerState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_cache::{CacheStorage, InMemoryStorage};
    use offline_core::{EngineConfig, RequestIdentity, RequestUrl, Response};
    use offline_fetch::ScriptedNetwork;

    fn config(generation: &str) -> EngineConfig {
        EngineConfig {
            generation: Generation::from(generation),
            ..Default::default()
        }
    }

    fn seeded_network(config: &EngineConfig) -> Arc<ScriptedNetwork> {
        let network = ScriptedNetwork::new();
        for url in config.seed_urls().unwrap() {
            network.set_response(&url.to_string(), Response::ok("seed"));
        }
        Arc::new(network)
    }

    #[tokio::test]
    async fn test_install_seeds_everything() {
        let config = config("v1");
        let seed_len = config.seed_urls().unwrap().len();
        let storage = Arc::new(InMemoryStorage::new());
        let worker = ServiceWorker::new(config.clone(), storage.clone(), seeded_network(&config)).unwrap();

        let report = worker.install().await.unwrap();
        assert_eq!(report.entries, seed_len);
        assert!(report.skip_waiting);
        assert_eq!(worker.state(), WorkerState::Installed);

        let store = storage.open(&Generation::from("v1")).await.unwrap();
        assert_eq!(store.len().await.unwrap(), seed_len);
    }

    #[tokio::test]
    async fn test_install_is_idempotent() {
        let config = config("v1");
        let storage = Arc::new(InMemoryStorage::new());
        let worker = ServiceWorker::new(config.clone(), storage.clone(), seeded_network(&config)).unwrap();

        worker.install().await.unwrap();
        let store = storage.open(&Generation::from("v1")).await.unwrap();
        let first = store.keys().await.unwrap();

        worker.install().await.unwrap();
        assert_eq!(store.keys().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_install_failure_leaves_no_generation() {
        let config = config("v1");
        let network = seeded_network(&config);
        network.fail("https://fittrack.app/splash/splash-1242x2688.png");
        let storage = Arc::new(InMemoryStorage::new());
        let worker = ServiceWorker::new(config, storage.clone(), network).unwrap();

        let err = worker.install().await.unwrap_err();
        assert!(err.is_seed_failure());
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(!storage.has(&Generation::from("v1")).await.unwrap());

        assert!(matches!(
            worker.activate().await,
            Err(WorkerError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_rejects_non_ok_seed() {
        let config = config("v1");
        let network = seeded_network(&config);
        network.set_response("https://fittrack.app/manifest.json", Response::new(404));
        let storage = Arc::new(InMemoryStorage::new());
        let worker = ServiceWorker::new(config, storage.clone(), network).unwrap();

        match worker.install().await {
            Err(WorkerError::SeedStatus { url, status }) => {
                assert_eq!(url, "https://fittrack.app/manifest.json");
                assert_eq!(status, 404);
            }
            other => panic!("expected seed status error, got {:?}", other),
        }
        assert!(storage.list_generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let config = config("v1");
        let worker = ServiceWorker::new(
            config.clone(),
            Arc::new(InMemoryStorage::new()),
            seeded_network(&config),
        )
        .unwrap();

        let err = worker.activate().await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::InvalidTransition {
                from: WorkerState::Parsed,
                to: WorkerState::Activating
            }
        ));
    }

    #[tokio::test]
    async fn test_activate_purges_other_generations() {
        let storage = Arc::new(InMemoryStorage::new());
        let stale = storage.open(&Generation::from("v0")).await.unwrap();
        let url = RequestUrl::parse("https://fittrack.app/").unwrap();
        stale.put(&RequestIdentity::get(&url), &Response::ok("old")).await.unwrap();
        storage.open(&Generation::from("scratch")).await.unwrap();

        let config = config("v1");
        let worker = ServiceWorker::new(config.clone(), storage.clone(), seeded_network(&config)).unwrap();
        let (_, report) = worker.start().await.unwrap();

        assert_eq!(
            report.deleted,
            vec![Generation::from("scratch"), Generation::from("v0")]
        );
        let remaining: Vec<_> = storage.list_generations().await.unwrap().into_iter().collect();
        assert_eq!(remaining, vec![Generation::from("v1")]);
        assert_eq!(stale.get(&RequestIdentity::get(&url)).await.unwrap(), None);
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_claims_open_views() {
        let config = config("v1");
        let worker = ServiceWorker::new(
            config.clone(),
            Arc::new(InMemoryStorage::new()),
            seeded_network(&config),
        )
        .unwrap();
        let view = worker.connect();
        assert_eq!(worker.clients().controller(view.id()), None);

        let (_, report) = worker.start().await.unwrap();
        assert_eq!(report.claimed, 1);
        assert_eq!(worker.clients().controller(view.id()), Some(Generation::from("v1")));
    }
}
