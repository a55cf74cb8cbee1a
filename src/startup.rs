use std::sync::Arc;

use qdrant_client::prelude::{QdrantClient, QdrantClientConfig};
use secrecy::ExposeSecret;
use tracing::info;

use crate::{
    configuration::{QdrantSettings, Settings},
    domain::{
        entities::{
            source::{Source, SourceReport},
            vector_point::SearchHit,
        },
        services::{
            cache_store::CacheStore,
            ingestion_pipeline::IngestionPipeline,
            lopdf_extractor::LopdfExtractor,
            source_processor::{SourceProcessingError, SourceProcessor},
            vector_store::{VectorStoreClient, VectorStoreError},
        },
    },
    helper::error_chain_fmt,
    ports::{
        file_system::FileSystem, language_model::LanguageModelError, pdf_extractor::PdfExtractor,
        vector_index::VectorIndex,
    },
    repositories::{
        local_file_system::LocalFileSystem, ollama_repository::OllamaRepository,
        qdrant_vector_index::QdrantVectorIndex,
        source_file_http_repository::SourceFileHttpRepository,
    },
};

/// Holds every collaborator of a run, built once from the settings
pub struct Application {
    processor: SourceProcessor,
}

impl Application {
    /// Connects to Qdrant and works on the local file system
    #[tracing::instrument(name = "Building the application", skip(settings))]
    pub async fn build(settings: Settings) -> Result<Self, ApplicationError> {
        let qdrant_client = get_qdrant_client(&settings.qdrant)?;

        Self::build_with(
            settings,
            Arc::new(QdrantVectorIndex::new(qdrant_client)),
            Arc::new(LocalFileSystem),
        )
        .await
    }

    /// Same as `build`, with the given vector index and file system
    pub async fn build_with(
        settings: Settings,
        vector_index: Arc<dyn VectorIndex>,
        file_system: Arc<dyn FileSystem>,
    ) -> Result<Self, ApplicationError> {
        let vector_store = VectorStoreClient::try_new(
            vector_index,
            &settings.qdrant.collection,
            settings.qdrant.collection_vector_size,
        )
        .await?;

        let ollama = Arc::new(OllamaRepository::try_new(&settings.ollama)?);

        let cache_store = CacheStore::new(
            file_system.clone(),
            settings.application.cache_path.clone(),
        )
        .with_max_age(settings.application.cache_max_age());
        let extractor: Arc<dyn PdfExtractor> = Arc::new(LopdfExtractor::new(file_system));
        let pipeline = IngestionPipeline::new(
            cache_store,
            extractor.clone(),
            settings.application.failure_policy,
        );

        let processor = SourceProcessor::new(
            pipeline,
            extractor,
            Arc::new(SourceFileHttpRepository::default()),
            ollama.clone(),
            ollama,
            vector_store,
            settings.application.max_sources,
        );

        info!("Application ready");
        Ok(Self { processor })
    }

    pub async fn process_sources(&self, sources: Vec<Source>) -> Vec<SourceReport> {
        self.processor.process(sources).await
    }

    pub async fn search_summaries(
        &self,
        query: &str,
        limit: u64,
    ) -> Result<Vec<SearchHit>, ApplicationError> {
        Ok(self.processor.search_summaries(query, limit).await?)
    }
}

/// Set up a client to Qdrant
pub fn get_qdrant_client(config: &QdrantSettings) -> Result<QdrantClient, ApplicationError> {
    let mut qdrant_config = QdrantClientConfig::from_url(&config.get_grpc_base_url());
    if let Some(api_key) = &config.api_key {
        qdrant_config.api_key = Some(api_key.expose_secret().clone());
    }

    QdrantClient::new(Some(qdrant_config)).map_err(|e| ApplicationError::QdrantError(e.to_string()))
}

#[derive(thiserror::Error)]
pub enum ApplicationError {
    #[error("Error from Qdrant: {0}")]
    QdrantError(String),
    #[error("Failed to set up the vector store")]
    VectorStore(#[from] VectorStoreError),
    #[error("Failed to set up the language model client")]
    LanguageModel(#[from] LanguageModelError),
    #[error("Failed to search the summaries")]
    Search(#[from] SourceProcessingError),
}

impl std::fmt::Debug for ApplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
