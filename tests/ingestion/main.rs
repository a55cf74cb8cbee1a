mod cache_store;
mod ingestion_pipeline;
