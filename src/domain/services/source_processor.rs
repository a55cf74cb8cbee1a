use std::{path::PathBuf, sync::Arc};

use futures::future::join_all;
use tracing::{info, warn};

use crate::{
    domain::{
        entities::{
            source::{ProcessedSource, Source, SourceReport},
            vector_point::{Payload, SearchHit},
        },
        services::{
            ingestion_pipeline::{FileIngestionError, IngestionPipeline, IngestionPipelineError},
            vector_store::{VectorStoreClient, VectorStoreError},
        },
    },
    helper::error_chain_fmt,
    ports::{
        language_model::{EmbeddingModel, LanguageModelError, TextGenerator},
        pdf_extractor::{PdfExtractor, PdfExtractorError},
        source_file_repository::{SourceFileRepository, SourceFileRepositoryError},
    },
};

pub const SOURCE_FIELD: &str = "source";
pub const SUMMARY_FIELD: &str = "summary";

fn summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following document in a few sentences. \
        Answer with the summary only.\n\n{}",
        text
    )
}

/// Turns sources into summaries stored in the vector index
///
/// Local files go through the cached ingestion pipeline.
/// URLs are downloaded and extracted on each run.
/// Each source then gets its summary generated, embedded and stored, concurrently with the others.
pub struct SourceProcessor {
    pipeline: IngestionPipeline,
    extractor: Arc<dyn PdfExtractor>,
    downloader: Arc<dyn SourceFileRepository>,
    embedder: Arc<dyn EmbeddingModel>,
    generator: Arc<dyn TextGenerator>,
    vector_store: VectorStoreClient,
    max_sources: usize,
}

impl SourceProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pipeline: IngestionPipeline,
        extractor: Arc<dyn PdfExtractor>,
        downloader: Arc<dyn SourceFileRepository>,
        embedder: Arc<dyn EmbeddingModel>,
        generator: Arc<dyn TextGenerator>,
        vector_store: VectorStoreClient,
        max_sources: usize,
    ) -> Self {
        Self {
            pipeline,
            extractor,
            downloader,
            embedder,
            generator,
            vector_store,
            max_sources,
        }
    }

    /// Processes every source and reports on each of them, in the order of `sources`
    ///
    /// Only the first `max_sources` files and the first `max_sources` URLs are kept.
    /// A failing source never prevents the others from being reported.
    #[tracing::instrument(name = "Processing sources", skip(self, sources), fields(nb_sources = sources.len()))]
    pub async fn process(&self, sources: Vec<Source>) -> Vec<SourceReport> {
        let sources = self.cap_sources(sources);

        let file_paths: Vec<PathBuf> = sources
            .iter()
            .filter_map(|source| match source {
                Source::File(path) => Some(path.clone()),
                Source::Url(_) => None,
            })
            .collect();
        let mut file_texts = self.ingest_files(&file_paths).await.into_iter();

        let inputs: Vec<(Source, Input)> = sources
            .into_iter()
            .map(|source| {
                let input = match &source {
                    Source::File(path) => Input::Text(file_texts.next().unwrap_or_else(|| {
                        Err(FileIngestionError::SourceNotFound(path.clone()).into())
                    })),
                    Source::Url(url) => Input::Download(url.clone()),
                };
                (source, input)
            })
            .collect();

        join_all(inputs.into_iter().map(|(source, input)| async move {
            let outcome = match input {
                Input::Text(text) => match text {
                    Ok(text) => self.summarize_and_store(&source, &text).await,
                    Err(error) => Err(error),
                },
                Input::Download(url) => match self.download_text(&url).await {
                    Ok(text) => self.summarize_and_store(&source, &text).await,
                    Err(error) => Err(error),
                },
            };

            if let Err(error) = &outcome {
                warn!(?error, "Failed to process {}", source);
            }
            SourceReport { source, outcome }
        }))
        .await
    }

    /// Returns the stored summaries closest to `query`, most similar first
    #[tracing::instrument(name = "Searching summaries", skip(self))]
    pub async fn search_summaries(
        &self,
        query: &str,
        limit: u64,
    ) -> Result<Vec<SearchHit>, SourceProcessingError> {
        let embeddings = self.embedder.embed(query).await?;
        Ok(self.vector_store.search(embeddings, limit).await?)
    }

    fn cap_sources(&self, sources: Vec<Source>) -> Vec<Source> {
        let (mut nb_files, mut nb_urls) = (0, 0);

        sources
            .into_iter()
            .filter(|source| {
                let count = match source {
                    Source::File(_) => &mut nb_files,
                    Source::Url(_) => &mut nb_urls,
                };
                *count += 1;
                if *count > self.max_sources {
                    warn!("Ignoring {}: at most {} per kind of source", source, self.max_sources);
                    return false;
                }
                true
            })
            .collect()
    }

    async fn ingest_files(&self, paths: &[PathBuf]) -> Vec<Result<String, SourceProcessingError>> {
        if paths.is_empty() {
            return Vec::new();
        }

        match self.pipeline.run(paths).await {
            Ok(texts) => texts
                .into_iter()
                .map(|text| text.map_err(SourceProcessingError::from))
                .collect(),
            Err(error) => {
                let error = Arc::new(error);
                paths
                    .iter()
                    .map(|_| Err(SourceProcessingError::Batch(error.clone())))
                    .collect()
            }
        }
    }

    async fn download_text(&self, url: &str) -> Result<String, SourceProcessingError> {
        let bytes = self.downloader.get_file(url).await?;
        Ok(self.extractor.extract_bytes(bytes).await?)
    }

    async fn summarize_and_store(
        &self,
        source: &Source,
        text: &str,
    ) -> Result<ProcessedSource, SourceProcessingError> {
        let summary = self.generator.generate(&summary_prompt(text)).await?;
        let embeddings = self.embedder.embed(&summary).await?;

        let payload = Payload::from([
            (SOURCE_FIELD.to_string(), source.to_string()),
            (SUMMARY_FIELD.to_string(), summary.clone()),
        ]);
        let point_id = self.vector_store.store(embeddings, payload).await?;

        info!(%point_id, "Stored the summary of {}", source);
        Ok(ProcessedSource { summary, point_id })
    }
}

enum Input {
    Text(Result<String, SourceProcessingError>),
    Download(String),
}

#[derive(thiserror::Error)]
pub enum SourceProcessingError {
    #[error(transparent)]
    Ingestion(#[from] FileIngestionError),
    #[error("The batch of files was aborted")]
    Batch(#[source] Arc<IngestionPipelineError>),
    #[error(transparent)]
    Download(#[from] SourceFileRepositoryError),
    #[error(transparent)]
    Extraction(#[from] PdfExtractorError),
    #[error("The language model failed")]
    LanguageModel(#[from] LanguageModelError),
    #[error("Failed to store the summary")]
    VectorStore(#[from] VectorStoreError),
}

impl std::fmt::Debug for SourceProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
