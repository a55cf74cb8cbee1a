use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::{
    domain::entities::cache_record::{Cache, CacheKey, CacheRecord, RecordValidation},
    helper::error_chain_fmt,
    ports::file_system::FileSystem,
};

const EMPTY_CACHE: &[u8] = b"{}";

/// Age after which a cached extraction should be refreshed
pub fn default_max_age() -> chrono::Duration {
    chrono::Duration::hours(24)
}

/// Durable mapping from cache key to extracted text, stored as one JSON document.
///
/// Loading never fails: a corrupted file degrades to a partial or empty cache.
/// Saving overwrites the whole document.
/// A single writer per cache file is assumed.
pub struct CacheStore {
    file_system: Arc<dyn FileSystem>,
    path: PathBuf,
    max_age: chrono::Duration,
}

impl CacheStore {
    pub fn new(file_system: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            file_system,
            path: path.into(),
            max_age: default_max_age(),
        }
    }

    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the cache file holding an empty mapping if it does not exist yet
    #[tracing::instrument(name = "Ensuring the cache file exists", skip(self), fields(path = %self.path.display()))]
    pub async fn ensure_exists(&self) -> Result<(), CacheStoreError> {
        self.file_system
            .ensure_exists(&self.path, EMPTY_CACHE)
            .await
            .map_err(|e| CacheStoreError::IOError(self.path.clone(), e))
    }

    /// Reads the cache file, dropping anything that is not a valid record
    #[tracing::instrument(name = "Loading the cache", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Cache {
        let bytes = match self.file_system.read_all(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(?error, "Cache file could not be read, starting from an empty cache");
                return Cache::new();
            }
        };

        let cache = parse_cache(&bytes);
        info!("Loaded {} cache records", cache.len());
        cache
    }

    #[tracing::instrument(name = "Saving the cache", skip(self, cache), fields(path = %self.path.display(), records = cache.len()))]
    pub async fn save(&self, cache: &Cache) -> Result<(), CacheStoreError> {
        let content = serde_json::to_vec_pretty(cache)?;

        self.file_system
            .write_all(&self.path, &content)
            .await
            .map_err(|e| CacheStoreError::IOError(self.path.clone(), e))
    }

    /// See [`is_stale`], evaluated against the current time
    pub fn is_stale(&self, timestamp: i64) -> bool {
        is_stale(timestamp, chrono::Utc::now().timestamp_millis(), self.max_age)
    }
}

/// Parses the cache document, keeping each valid entry and dropping the others
fn parse_cache(bytes: &[u8]) -> Cache {
    let document: JsonValue = match serde_json::from_slice(bytes) {
        Ok(document) => document,
        Err(error) => {
            warn!(%error, "Cache file is not valid JSON, starting from an empty cache");
            return Cache::new();
        }
    };

    let JsonValue::Object(entries) = document else {
        warn!("Cache file does not hold a JSON object, starting from an empty cache");
        return Cache::new();
    };

    entries
        .iter()
        .filter_map(|(key, value)| match CacheRecord::validate(value) {
            RecordValidation::Valid(record) => Some((CacheKey::from(key.as_str()), record)),
            RecordValidation::Invalid(reason) => {
                warn!(%key, %reason, "Dropping invalid cache record");
                None
            }
        })
        .collect()
}

/// A record written at `timestamp` is stale once it is older than `max_age` at `now`.
///
/// All values are epoch milliseconds. A timestamp in the future is never stale.
pub fn is_stale(timestamp: i64, now: i64, max_age: chrono::Duration) -> bool {
    now.saturating_sub(timestamp) > max_age.num_milliseconds()
}

#[derive(thiserror::Error)]
pub enum CacheStoreError {
    #[error("Failed to access the cache file {}", .0.display())]
    IOError(PathBuf, #[source] std::io::Error),
    #[error("Failed to serialize the cache")]
    SerializationError(#[from] serde_json::Error),
}

impl std::fmt::Debug for CacheStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
