use anyhow::{Result, anyhow};
use fjall::Keyspace;
use rand::RngExt;
use serde::Deserialize;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;
use tokio::task;

use crate::config::CacheConfig;
use crate::models::Coordinates;

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

/// On-disk key/value store with per-entry expiry
#[derive(Clone)]
pub struct PersistentCache {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> anyhow::Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl PersistentCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("cache", fjall::KeyspaceCreateOptions::default)?;
        Ok(PersistentCache { store: items })
    }

    /// Stores a serializable value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or(anyhow!("TTL overflow"))?
            .duration_since(UNIX_EPOCH)?
            .as_secs();
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry)?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        if let Some(bytes) = maybe_bytes {
            let entry: StoredEntry<T> = postcard::from_bytes(&bytes)?;
            let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

            if now < entry.expires_at {
                tracing::debug!("Key found and still fresh");
                Ok(Some(entry.value))
            } else {
                tracing::debug!("Key found but expired");
                self.remove(key).await?;
                Ok(None)
            }
        } else {
            tracing::debug!("Key not found");
            Ok(None)
        }
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// City -> coordinates cache shared across pipeline runs.
///
/// Lookups for the same city share a single in-flight resolution, so
/// concurrent callers never geocode the same name twice. Only successful
/// resolutions are remembered; a failed lookup is retried on the next call.
/// When a [`PersistentCache`] is attached, hits survive process restarts.
#[derive(Default)]
pub struct CoordinateCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Coordinates>>>>,
    persistent: Option<PersistentCache>,
    ttl: Duration,
}

impl CoordinateCache {
    /// Process-local cache only
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache backed by an on-disk store
    #[must_use]
    pub fn with_persistence(persistent: PersistentCache, ttl: Duration) -> Self {
        Self {
            entries: Mutex::default(),
            persistent: Some(persistent),
            ttl,
        }
    }

    /// Cache as configured. An on-disk store that cannot be opened degrades
    /// to an in-memory cache.
    pub fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::in_memory();
        }
        let location = config.resolved_location();
        match PersistentCache::open(&location) {
            Ok(store) => Self::with_persistence(store, config.ttl()),
            Err(err) => {
                tracing::warn!(
                    "Could not open coordinate cache at {}: {:?}",
                    location.display(),
                    err
                );
                Self::in_memory()
            }
        }
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent.is_some()
    }

    fn key(city: &str) -> String {
        city.trim().to_lowercase()
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<Coordinates>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key.to_string()).or_default().clone()
    }

    /// Return cached coordinates for `city`, or run `resolve` to populate them
    pub async fn get_or_resolve<F, Fut>(&self, city: &str, resolve: F) -> Option<Coordinates>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Coordinates>>,
    {
        let key = Self::key(city);
        let cell = self.cell(&key);

        cell.get_or_try_init(move || async move {
            if let Some(stored) = self.load(&key).await {
                return Ok(stored);
            }
            match resolve().await {
                Some(coordinates) => {
                    self.store(&key, coordinates).await;
                    Ok(coordinates)
                }
                None => Err(()),
            }
        })
        .await
        .ok()
        .copied()
    }

    async fn load(&self, key: &str) -> Option<Coordinates> {
        let persistent = self.persistent.as_ref()?;
        match persistent.get::<Coordinates>(&Self::storage_key(key)).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("Reading coordinates for {} from cache failed: {:?}", key, err);
                None
            }
        }
    }

    async fn store(&self, key: &str, coordinates: Coordinates) {
        let Some(persistent) = &self.persistent else {
            return;
        };
        // spread expiry so a batch of cities doesn't go stale at once
        let jitter: f64 = rand::rng().random_range(0.9..1.1);
        let ttl = self.ttl.mul_f64(jitter);
        if let Err(err) = persistent.put(&Self::storage_key(key), coordinates, ttl).await {
            tracing::warn!("Writing coordinates for {} to cache failed: {:?}", key, err);
        }
    }

    fn storage_key(key: &str) -> String {
        format!("coordinates:{key}")
    }
}
