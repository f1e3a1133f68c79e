use super::*;
use crate::keys::{KeyDirectory, KeyError};
use crate::usage::{UsageRecord, UsageRecorder};
use chrono::{TimeZone, Utc};

fn record(identity: &str, message: &str) -> UsageRecord {
    UsageRecord {
        identity: identity.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
        message: message.to_string(),
        response: format!("re: {}", message),
        provider_used: "ollama:llama2".to_string(),
        source_address: "10.1.2.3".to_string(),
    }
}

#[tokio::test]
async fn test_record_and_read_back() {
    let storage = SqliteStorage::in_memory().await.unwrap();
    storage.record(&record("ak_a", "first")).await.unwrap();
    storage.record(&record("ak_a", "second")).await.unwrap();
    storage.record(&record("ak_b", "other")).await.unwrap();

    assert_eq!(storage.usage_count().await.unwrap(), 3);

    let recent = storage.recent_usage("ak_a", 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].message, "second");
    assert_eq!(recent[1], record("ak_a", "first"));
}

#[tokio::test]
async fn test_resolve_active_key() {
    let storage = SqliteStorage::in_memory().await.unwrap();
    storage
        .upsert_api_key("ak_live", Some("primary"), 25, true)
        .await
        .unwrap();

    let caller = storage.resolve("ak_live").await.unwrap();
    assert_eq!(caller.identity, "ak_live");
    assert_eq!(caller.name.as_deref(), Some("primary"));
    assert_eq!(caller.daily_limit, 25);
}

#[tokio::test]
async fn test_inactive_and_unknown_keys_are_invalid() {
    let storage = SqliteStorage::in_memory().await.unwrap();
    storage
        .upsert_api_key("ak_revoked", None, 10, false)
        .await
        .unwrap();

    assert_eq!(storage.resolve("ak_revoked").await, Err(KeyError::Invalid));
    assert_eq!(storage.resolve("ak_missing").await, Err(KeyError::Invalid));
}

#[tokio::test]
async fn test_upsert_updates_limit() {
    let storage = SqliteStorage::in_memory().await.unwrap();
    storage.upsert_api_key("ak", None, 10, true).await.unwrap();
    storage.upsert_api_key("ak", None, 2, true).await.unwrap();
    assert_eq!(storage.resolve("ak").await.unwrap().daily_limit, 2);
}

#[tokio::test]
async fn test_file_database_and_health_check() {
    let dir = std::env::temp_dir().join(format!("chatgate-test-{}", uuid::Uuid::new_v4()));
    let path = dir.join("nested").join("chatgate.db");

    let storage = SqliteStorage::new(&path).await.unwrap();
    storage.health_check().await.unwrap();
    assert!(path.exists());

    drop(storage);
    let _ = std::fs::remove_dir_all(&dir);
}
