use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::join_all;
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    domain::{
        entities::cache_record::{Cache, CacheKey, CacheRecord},
        services::cache_store::{CacheStore, CacheStoreError},
    },
    helper::error_chain_fmt,
    ports::pdf_extractor::{PdfExtractor, PdfExtractorError},
};

/// What to do with the batch when one file cannot be extracted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first failing file (in input order) fails the whole run, nothing is persisted
    #[default]
    AbortBatch,
    /// Failing files carry their own error, the others are returned and cached
    IsolateFailures,
}

/// Extracted text of one input file, or why it could not be produced
pub type IngestedText = Result<String, FileIngestionError>;

/// Extracts the text of PDF files, going through the cache first
pub struct IngestionPipeline {
    cache_store: CacheStore,
    extractor: Arc<dyn PdfExtractor>,
    failure_policy: FailurePolicy,
}

impl IngestionPipeline {
    pub fn new(
        cache_store: CacheStore,
        extractor: Arc<dyn PdfExtractor>,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            cache_store,
            extractor,
            failure_policy,
        }
    }

    /// Returns the text of each file, index for index with `file_paths`.
    ///
    /// A file whose key has a fresh record in the cache is not extracted again.
    /// The others are extracted concurrently, then their records are merged in the cache
    /// one after the other, in input order. The cache is saved once at the end of the run.
    ///
    /// With `FailurePolicy::AbortBatch` the returned texts are all `Ok`.
    #[tracing::instrument(name = "Running the ingestion pipeline", skip(self), fields(policy = ?self.failure_policy))]
    pub async fn run(
        &self,
        file_paths: &[PathBuf],
    ) -> Result<Vec<IngestedText>, IngestionPipelineError> {
        self.cache_store.ensure_exists().await?;
        let mut cache = self.cache_store.load().await;

        let keys: Vec<CacheKey> = file_paths
            .iter()
            .map(|path| CacheKey::from_path(path))
            .collect();

        let cached: Vec<Option<String>> = keys
            .iter()
            .map(|key| self.fresh_content(&cache, key))
            .collect();

        let nb_misses = cached.iter().filter(|hit| hit.is_none()).count();
        info!(
            "{} cache hit(s), {} file(s) to extract",
            file_paths.len() - nb_misses,
            nb_misses
        );

        // Misses are extracted concurrently, the cache is not touched until they all completed
        let lookups = join_all(file_paths.iter().zip(cached).map(|(path, hit)| async move {
            match hit {
                Some(content) => Lookup::Hit(content),
                None => Lookup::Extracted(self.extract_file(path).await),
            }
        }))
        .await;

        let mut texts = Vec::with_capacity(file_paths.len());
        for ((path, key), lookup) in file_paths.iter().zip(keys).zip(lookups) {
            match lookup {
                Lookup::Hit(content) => texts.push(Ok(content)),
                Lookup::Extracted(Ok(content)) => {
                    cache.insert(key, CacheRecord::new(content.clone()));
                    texts.push(Ok(content));
                }
                Lookup::Extracted(Err(source)) => {
                    error!(error = ?source, "Failed to ingest {}", path.display());
                    if self.failure_policy == FailurePolicy::AbortBatch {
                        return Err(IngestionPipelineError::File {
                            path: path.clone(),
                            source,
                        });
                    }
                    texts.push(Err(source));
                }
            }
        }

        self.cache_store.save(&cache).await?;

        Ok(texts)
    }

    fn fresh_content(&self, cache: &Cache, key: &CacheKey) -> Option<String> {
        cache
            .get(key)
            .filter(|record| !self.cache_store.is_stale(record.timestamp))
            .map(|record| record.content.clone())
    }

    async fn extract_file(&self, path: &Path) -> IngestedText {
        match self.extractor.extract(path).await? {
            Some(content) => Ok(content),
            None => Err(FileIngestionError::SourceNotFound(path.to_path_buf())),
        }
    }
}

enum Lookup {
    Hit(String),
    Extracted(IngestedText),
}

#[derive(thiserror::Error)]
pub enum FileIngestionError {
    #[error("File {} does not exist", .0.display())]
    SourceNotFound(PathBuf),
    #[error(transparent)]
    Extraction(#[from] PdfExtractorError),
}

impl std::fmt::Debug for FileIngestionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum IngestionPipelineError {
    #[error("Failed to ingest {}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: FileIngestionError,
    },
    #[error(transparent)]
    Cache(#[from] CacheStoreError),
}

impl std::fmt::Debug for IngestionPipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
