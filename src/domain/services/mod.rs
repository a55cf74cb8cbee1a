pub mod cache_store;
pub mod ingestion_pipeline;
pub mod lopdf_extractor;
pub mod source_processor;
pub mod vector_store;
