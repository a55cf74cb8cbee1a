use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use claims::{assert_err, assert_matches, assert_ok, assert_some};
use pdf_ingestion::{
    domain::{
        entities::cache_record::{Cache, CacheKey, CacheRecord},
        services::{
            cache_store::CacheStore,
            ingestion_pipeline::{
                FailurePolicy, FileIngestionError, IngestionPipeline, IngestionPipelineError,
            },
            lopdf_extractor::LopdfExtractor,
        },
    },
    repositories::in_memory_file_system::InMemoryFileSystem,
};

use crate::helpers::{build_pdf, init_tracing, FakeExtractor, CACHE_PATH};

fn paths(paths: &[&str]) -> Vec<PathBuf> {
    paths.iter().map(PathBuf::from).collect()
}

fn cache_store(file_system: &Arc<InMemoryFileSystem>) -> CacheStore {
    CacheStore::new(file_system.clone(), CACHE_PATH)
}

async fn save_cache(file_system: &Arc<InMemoryFileSystem>, records: &[(&str, CacheRecord)]) {
    let cache: Cache = records
        .iter()
        .map(|(key, record)| (CacheKey::from(*key), record.clone()))
        .collect();
    cache_store(file_system).save(&cache).await.unwrap();
}

fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[tokio::test]
async fn two_new_pdfs_are_extracted_and_cached() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    file_system
        .insert("./data/1706.03762.pdf", build_pdf(&["Attention is all you need"]))
        .await;
    file_system
        .insert("./data/2410.16928.pdf", build_pdf(&["xLSTM time series"]))
        .await;
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        Arc::new(LopdfExtractor::new(file_system.clone())),
        FailurePolicy::AbortBatch,
    );
    let before = now();

    let texts = assert_ok!(
        pipeline
            .run(&paths(&["./data/1706.03762.pdf", "./data/2410.16928.pdf"]))
            .await
    );

    assert_eq!(texts.len(), 2);
    assert!(texts[0].as_ref().unwrap().contains("Attention is all you need"));
    assert!(texts[1].as_ref().unwrap().contains("xLSTM time series"));

    let cache = cache_store(&file_system).load().await;
    assert_eq!(cache.len(), 2);
    let record = assert_some!(cache.get(&CacheKey::from("1706.03762")));
    assert_eq!(Some(&record.content), texts[0].as_ref().ok());
    assert!(record.timestamp >= before && record.timestamp <= now());
    assert_eq!(file_system.write_count(), 1);
}

#[tokio::test]
async fn a_fresh_cache_record_is_returned_without_extraction() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    save_cache(
        &file_system,
        &[(
            "1706.03762",
            CacheRecord {
                content: "cached text".into(),
                timestamp: now(),
            },
        )],
    )
    .await;
    let extractor = Arc::new(FakeExtractor::default());
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        extractor.clone(),
        FailurePolicy::AbortBatch,
    );

    let texts = assert_ok!(pipeline.run(&paths(&["./data/1706.03762.pdf"])).await);

    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].as_ref().ok(), Some(&"cached text".to_string()));
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn the_cache_key_ignores_the_directory_of_the_file() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    save_cache(
        &file_system,
        &[("paper", CacheRecord::new("cached text".into()))],
    )
    .await;
    let extractor = Arc::new(FakeExtractor::default());
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        extractor.clone(),
        FailurePolicy::AbortBatch,
    );

    let texts = assert_ok!(pipeline.run(&paths(&["/elsewhere/paper.pdf"])).await);

    assert_eq!(texts[0].as_ref().ok(), Some(&"cached text".to_string()));
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn a_stale_record_is_extracted_again_and_overwritten() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    let stale_timestamp = now() - chrono::Duration::hours(25).num_milliseconds();
    save_cache(
        &file_system,
        &[(
            "paper",
            CacheRecord {
                content: "old text".into(),
                timestamp: stale_timestamp,
            },
        )],
    )
    .await;
    let extractor = Arc::new(FakeExtractor::default().with_text("./paper.pdf", "new text"));
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        extractor.clone(),
        FailurePolicy::AbortBatch,
    );

    let texts = assert_ok!(pipeline.run(&paths(&["./paper.pdf"])).await);

    assert_eq!(texts[0].as_ref().ok(), Some(&"new text".to_string()));
    assert_eq!(extractor.calls(), 1);
    let cache = cache_store(&file_system).load().await;
    let record = assert_some!(cache.get(&CacheKey::from("paper")));
    assert_eq!(record.content, "new text");
    assert!(record.timestamp > stale_timestamp);
}

#[tokio::test]
async fn a_shorter_max_age_refreshes_records_sooner() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    save_cache(
        &file_system,
        &[(
            "paper",
            CacheRecord {
                content: "old text".into(),
                timestamp: now() - chrono::Duration::minutes(10).num_milliseconds(),
            },
        )],
    )
    .await;
    let extractor = Arc::new(FakeExtractor::default().with_text("paper.pdf", "new text"));
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system).with_max_age(chrono::Duration::minutes(5)),
        extractor.clone(),
        FailurePolicy::AbortBatch,
    );

    let texts = assert_ok!(pipeline.run(&paths(&["paper.pdf"])).await);

    assert_eq!(texts[0].as_ref().ok(), Some(&"new text".to_string()));
}

#[tokio::test]
async fn hits_and_misses_keep_the_input_order() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    save_cache(&file_system, &[("b", CacheRecord::new("cached b".into()))]).await;
    let extractor = Arc::new(
        FakeExtractor::default()
            .with_text("a.pdf", "extracted a")
            .with_text("c.pdf", "extracted c"),
    );
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        extractor.clone(),
        FailurePolicy::AbortBatch,
    );

    let texts = assert_ok!(pipeline.run(&paths(&["a.pdf", "b.pdf", "c.pdf"])).await);

    let texts: Vec<String> = texts.into_iter().map(Result::unwrap).collect();
    assert_eq!(texts, vec!["extracted a", "cached b", "extracted c"]);
    assert_eq!(extractor.calls(), 2);
    assert_eq!(cache_store(&file_system).load().await.len(), 3);
}

#[tokio::test]
async fn a_missing_file_aborts_the_batch_without_saving() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    let extractor = Arc::new(FakeExtractor::default().with_text("./paper.pdf", "text"));
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        extractor,
        FailurePolicy::AbortBatch,
    );

    let error = assert_err!(
        pipeline
            .run(&paths(&["./paper.pdf", "./nonexistent.pdf"]))
            .await
    );

    assert_matches!(
        error,
        IngestionPipelineError::File {
            ref path,
            source: FileIngestionError::SourceNotFound(_),
        } if path == Path::new("./nonexistent.pdf")
    );
    assert_eq!(file_system.write_count(), 0);
    assert!(cache_store(&file_system).load().await.is_empty());
}

#[tokio::test]
async fn the_first_failing_file_in_input_order_is_reported() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    let extractor = Arc::new(FakeExtractor::default().with_failure("broken.pdf", "bad xref"));
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        extractor,
        FailurePolicy::AbortBatch,
    );

    let error = assert_err!(pipeline.run(&paths(&["broken.pdf", "missing.pdf"])).await);

    assert_matches!(
        error,
        IngestionPipelineError::File {
            ref path,
            source: FileIngestionError::Extraction(_),
        } if path == Path::new("broken.pdf")
    );
}

#[tokio::test]
async fn isolated_failures_keep_the_other_files() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    let extractor = Arc::new(FakeExtractor::default().with_text("paper.pdf", "text"));
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        extractor,
        FailurePolicy::IsolateFailures,
    );

    let texts = assert_ok!(pipeline.run(&paths(&["missing.pdf", "paper.pdf"])).await);

    assert_matches!(
        &texts[0],
        Err(FileIngestionError::SourceNotFound(path)) if path == Path::new("missing.pdf")
    );
    assert_eq!(texts[1].as_ref().ok(), Some(&"text".to_string()));

    let cache = cache_store(&file_system).load().await;
    assert_eq!(cache.len(), 1);
    assert_some!(cache.get(&CacheKey::from("paper")));
}

#[tokio::test]
async fn an_empty_batch_still_creates_the_cache_file() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        Arc::new(FakeExtractor::default()),
        FailurePolicy::AbortBatch,
    );

    let texts = assert_ok!(pipeline.run(&[]).await);

    assert!(texts.is_empty());
    assert_some!(file_system.get(Path::new(CACHE_PATH)).await);
}

#[tokio::test]
async fn a_cache_that_cannot_be_saved_fails_the_run() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    file_system.insert(CACHE_PATH, "{}").await;
    file_system.fail_writes();
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        Arc::new(FakeExtractor::default().with_text("paper.pdf", "text")),
        FailurePolicy::AbortBatch,
    );

    let error = assert_err!(pipeline.run(&paths(&["paper.pdf"])).await);

    assert_matches!(error, IngestionPipelineError::Cache(_));
}

#[tokio::test]
async fn a_corrupted_cache_is_rebuilt_from_extractions() {
    init_tracing();
    let file_system = Arc::new(InMemoryFileSystem::new());
    file_system.insert(CACHE_PATH, "{ bad json }").await;
    let extractor = Arc::new(FakeExtractor::default().with_text("paper.pdf", "text"));
    let pipeline = IngestionPipeline::new(
        cache_store(&file_system),
        extractor.clone(),
        FailurePolicy::AbortBatch,
    );

    assert_ok!(pipeline.run(&paths(&["paper.pdf"])).await);

    assert_eq!(extractor.calls(), 1);
    assert_eq!(cache_store(&file_system).load().await.len(), 1);
}
