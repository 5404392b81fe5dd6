//! In-memory storage backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use offline_core::{Generation, RequestIdentity, Response};

use crate::storage::{CacheError, CacheResult, CacheStorage, CacheStore, Store};

/// Process-local storage holding every generation in memory.
#[derive(Default)]
pub struct InMemoryStorage {
    generations: RwLock<BTreeMap<Generation, Arc<MemoryStore>>>,
}

impl InMemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for InMemoryStorage {
    async fn open(&self, generation: &Generation) -> CacheResult<Store> {
        let mut generations = self
            .generations
            .write()
            .map_err(|_| CacheError::LockPoisoned("generations".to_string()))?;

        let store: Store = generations
            .entry(generation.clone())
            .or_insert_with(|| Arc::new(MemoryStore::new(generation.clone())))
            .clone();

        Ok(store)
    }

    async fn has(&self, generation: &Generation) -> CacheResult<bool> {
        let generations = self
            .generations
            .read()
            .map_err(|_| CacheError::LockPoisoned("generations".to_string()))?;
        Ok(generations.contains_key(generation))
    }

    async fn list_generations(&self) -> CacheResult<BTreeSet<Generation>> {
        let generations = self
            .generations
            .read()
            .map_err(|_| CacheError::LockPoisoned("generations".to_string()))?;
        Ok(generations.keys().cloned().collect())
    }

    async fn delete_generation(&self, generation: &Generation) -> CacheResult<bool> {
        let removed = self
            .generations
            .write()
            .map_err(|_| CacheError::LockPoisoned("generations".to_string()))?
            .remove(generation);

        match removed {
            Some(store) => {
                store.evict()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
struct StoreState {
    entries: HashMap<RequestIdentity, Response>,
    evicted: bool,
}

/// One generation held in memory.
pub struct MemoryStore {
    generation: Generation,
    state: RwLock<StoreState>,
}

impl MemoryStore {
    fn new(generation: Generation) -> Self {
        Self {
            generation,
            state: RwLock::new(StoreState::default()),
        }
    }

    fn evict(&self) -> CacheResult<()> {
        let mut state = self.write_state()?;
        state.entries.clear();
        state.evicted = true;
        Ok(())
    }

    fn read_state(&self) -> CacheResult<std::sync::RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| CacheError::LockPoisoned(self.generation.to_string()))
    }

    fn write_state(&self) -> CacheResult<std::sync::RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| CacheError::LockPoisoned(self.generation.to_string()))
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn generation(&self) -> &Generation {
        &self.generation
    }

    async fn get(&self, identity: &RequestIdentity) -> CacheResult<Option<Response>> {
        if !identity.is_get() {
            return Ok(None);
        }
        Ok(self.read_state()?.entries.get(identity).cloned())
    }

    async fn put(&self, identity: &RequestIdentity, response: &Response) -> CacheResult<()> {
        if !identity.is_get() {
            return Err(CacheError::MethodNotCacheable(identity.method().to_string()));
        }

        let mut state = self.write_state()?;
        // Writes racing a generation delete are dropped
        if !state.evicted {
            state.entries.insert(identity.clone(), response.clone());
        }
        Ok(())
    }

    async fn delete(&self, identity: &RequestIdentity) -> CacheResult<bool> {
        Ok(self.write_state()?.entries.remove(identity).is_some())
    }

    async fn keys(&self) -> CacheResult<Vec<RequestIdentity>> {
        let mut keys: Vec<RequestIdentity> = self.read_state()?.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_core::{Method, RequestUrl};

    fn identity(path: &str) -> RequestIdentity {
        let url = RequestUrl::parse("https://fittrack.app").unwrap().resolve(path).unwrap();
        RequestIdentity::get(&url)
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = InMemoryStorage::new();
        let generation = Generation::from("v1");

        let a = storage.open(&generation).await.unwrap();
        a.put(&identity("/"), &Response::ok("root")).await.unwrap();

        let b = storage.open(&generation).await.unwrap();
        assert_eq!(b.get(&identity("/")).await.unwrap(), Some(Response::ok("root")));
        assert_eq!(storage.list_generations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = InMemoryStorage::new();
        let store = storage.open(&Generation::from("v1")).await.unwrap();

        store.put(&identity("/styles/main.css"), &Response::ok("old")).await.unwrap();
        store.put(&identity("/styles/main.css"), &Response::ok("new")).await.unwrap();

        let entry = store.get(&identity("/styles/main.css")).await.unwrap().unwrap();
        assert_eq!(entry.text(), Some("new"));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_miss_is_none() {
        let storage = InMemoryStorage::new();
        let store = storage.open(&Generation::from("v1")).await.unwrap();
        assert_eq!(store.get(&identity("/missing.json")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_get_rejected() {
        let storage = InMemoryStorage::new();
        let store = storage.open(&Generation::from("v1")).await.unwrap();
        let url = RequestUrl::parse("https://fittrack.app/api/meals").unwrap();
        let post = RequestIdentity::new(&Method::POST, &url);

        let err = store.put(&post, &Response::ok("{}")).await.unwrap_err();
        assert!(matches!(err, CacheError::MethodNotCacheable(m) if m == "POST"));
        assert_eq!(store.get(&post).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let storage = InMemoryStorage::new();
        let v1 = storage.open(&Generation::from("v1")).await.unwrap();
        let v2 = storage.open(&Generation::from("v2")).await.unwrap();

        v1.put(&identity("/"), &Response::ok("one")).await.unwrap();
        assert_eq!(v2.get(&identity("/")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let storage = InMemoryStorage::new();
        let v1 = Generation::from("v1");
        storage.open(&v1).await.unwrap();

        assert!(storage.delete_generation(&v1).await.unwrap());
        assert!(!storage.delete_generation(&v1).await.unwrap());
        assert!(!storage.has(&v1).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_handle_reads_absent_after_delete() {
        let storage = InMemoryStorage::new();
        let v1 = Generation::from("v1");
        let store = storage.open(&v1).await.unwrap();
        store.put(&identity("/"), &Response::ok("root")).await.unwrap();

        storage.delete_generation(&v1).await.unwrap();

        assert_eq!(store.get(&identity("/")).await.unwrap(), None);
        store.put(&identity("/"), &Response::ok("late")).await.unwrap();
        assert_eq!(store.get(&identity("/")).await.unwrap(), None);

        // Reopening creates a fresh, empty generation
        let reopened = storage.open(&v1).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keys_sorted() {
        let storage = InMemoryStorage::new();
        let store = storage.open(&Generation::from("v1")).await.unwrap();
        store.put(&identity("/b"), &Response::ok("b")).await.unwrap();
        store.put(&identity("/a"), &Response::ok("a")).await.unwrap();

        let keys = store.keys().await.unwrap();
        assert_eq!(keys, vec![identity("/a"), identity("/b")]);
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_distinct_keys() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = storage.open(&Generation::from("v1")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .put(&identity(&format!("/icons/{}.png", i)), &Response::ok(vec![i as u8]))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await.unwrap(), 16);
    }
}
