use std::sync::Arc;

use claims::{assert_err, assert_matches, assert_ok, assert_some_eq};
use fake::{faker::lorem::en::Paragraph, Fake};
use pdf_ingestion::{
    domain::{
        entities::cache_record::{Cache, CacheKey, CacheRecord},
        services::cache_store::{CacheStore, CacheStoreError},
    },
    repositories::local_file_system::LocalFileSystem,
};
use serde_json::Value as JsonValue;
use tempfile::TempDir;

use crate::helpers::init_tracing;

fn cache_store_in(directory: &TempDir) -> CacheStore {
    init_tracing();
    CacheStore::new(
        Arc::new(LocalFileSystem::new()),
        directory.path().join("cache.json"),
    )
}

#[tokio::test]
async fn ensure_exists_creates_an_empty_json_object_on_disk() {
    let directory = TempDir::new().unwrap();
    let store = cache_store_in(&directory);

    assert_ok!(store.ensure_exists().await);

    let content = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(content, "{}");
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn ensure_exists_never_truncates_an_existing_cache() {
    let directory = TempDir::new().unwrap();
    let store = cache_store_in(&directory);
    let mut cache = Cache::new();
    cache.insert(
        CacheKey::from("2410.16928"),
        CacheRecord::new(Paragraph(2..4).fake()),
    );
    assert_ok!(store.save(&cache).await);

    assert_ok!(store.ensure_exists().await);

    assert_eq!(store.load().await, cache);
}

#[tokio::test]
async fn records_survive_a_save_and_a_new_store_on_the_same_file() {
    let directory = TempDir::new().unwrap();
    let content: String = Paragraph(3..6).fake();
    let mut cache = Cache::new();
    cache.insert(CacheKey::from("1706.03762"), CacheRecord::new(content.clone()));

    assert_ok!(cache_store_in(&directory).save(&cache).await);
    let loaded = cache_store_in(&directory).load().await;

    assert_some_eq!(
        loaded
            .get(&CacheKey::from("1706.03762"))
            .map(|record| record.content.clone()),
        content
    );
}

#[tokio::test]
async fn the_cache_file_maps_keys_to_content_and_timestamp() {
    let directory = TempDir::new().unwrap();
    let store = cache_store_in(&directory);
    let mut cache = Cache::new();
    cache.insert(
        CacheKey::from("paper"),
        CacheRecord {
            content: "text".into(),
            timestamp: 1_700_000_000_000,
        },
    );

    assert_ok!(store.save(&cache).await);

    let document: JsonValue =
        serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
    assert_eq!(
        document,
        serde_json::json!({ "paper": { "content": "text", "timestamp": 1_700_000_000_000_i64 } })
    );
}

#[tokio::test]
async fn a_corrupted_file_loads_empty_and_is_replaced_on_save() {
    let directory = TempDir::new().unwrap();
    let store = cache_store_in(&directory);
    std::fs::write(store.path(), "{ \"truncated\": { \"content\": ").unwrap();

    assert!(store.load().await.is_empty());

    let mut cache = Cache::new();
    cache.insert(CacheKey::from("paper"), CacheRecord::new("text".into()));
    assert_ok!(store.save(&cache).await);

    assert_eq!(store.load().await, cache);
}

#[tokio::test]
async fn no_temporary_file_is_left_after_a_save() {
    let directory = TempDir::new().unwrap();
    let store = cache_store_in(&directory);

    assert_ok!(store.save(&Cache::new()).await);

    let entries: Vec<_> = std::fs::read_dir(directory.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("cache.json")]);
}

#[tokio::test]
async fn a_cache_in_a_missing_directory_cannot_be_created() {
    let directory = TempDir::new().unwrap();
    let store = CacheStore::new(
        Arc::new(LocalFileSystem::new()),
        directory.path().join("missing").join("cache.json"),
    );

    let error = assert_err!(store.ensure_exists().await);

    assert_matches!(error, CacheStoreError::IOError(..));
    assert!(store.load().await.is_empty());
}
