//! Synchronizer behaviour against a mocked mail source

mod common;

use std::sync::Arc;

use common::{create_test_message, MockMailSource};
use gmail_rules::{GmailError, MemoryStore, MessageStore, SyncConfig, Synchronizer};

fn sync_config() -> SyncConfig {
    SyncConfig {
        query: "in:inbox".to_string(),
        max_results: 50,
        max_concurrent_requests: 4,
    }
}

#[tokio::test]
async fn test_sync_fetches_and_stores_listed_messages() {
    let mut source = MockMailSource::new();
    source
        .expect_list_message_ids()
        .withf(|query: &str, max: &u32| query == "in:inbox" && *max == 50)
        .times(1)
        .returning(|_, _| Ok(vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]));
    source
        .expect_get_message()
        .times(3)
        .returning(|id| Ok(create_test_message(id, "a@example.com", "Hello")));

    let store = MemoryStore::new();
    let report = Synchronizer::new(Arc::new(source), &sync_config())
        .sync(&store)
        .await
        .unwrap();

    assert_eq!(report.listed, 3);
    assert_eq!(report.stored, 3);
    assert!(report.failed_message_ids.is_empty());
    assert_eq!(store.len().await.unwrap(), 3);
}

#[tokio::test]
async fn test_sync_skips_failed_fetches() {
    let mut source = MockMailSource::new();
    source
        .expect_list_message_ids()
        .returning(|_, _| Ok(vec!["ok".to_string(), "gone".to_string()]));
    source.expect_get_message().returning(|id| {
        if id == "gone" {
            Err(GmailError::MessageNotFound("Resource not found".to_string()))
        } else {
            Ok(create_test_message(id, "a@example.com", "Hello"))
        }
    });

    let store = MemoryStore::new();
    let report = Synchronizer::new(Arc::new(source), &sync_config())
        .sync(&store)
        .await
        .unwrap();

    assert_eq!(report.stored, 1);
    assert_eq!(report.failed_message_ids, vec!["gone".to_string()]);
    assert!(store.get("ok").await.unwrap().is_some());
    assert!(store.get("gone").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sync_listing_failure_is_source_unavailable() {
    let mut source = MockMailSource::new();
    source
        .expect_list_message_ids()
        .returning(|_, _| Err(GmailError::NetworkError("Connection error".to_string())));
    source.expect_get_message().never();

    let store = MemoryStore::new();
    let result = Synchronizer::new(Arc::new(source), &sync_config())
        .sync(&store)
        .await;

    assert!(matches!(result, Err(GmailError::SourceUnavailable(_))));
}

#[tokio::test]
async fn test_resync_replaces_existing_record() {
    let store = MemoryStore::new();
    store
        .upsert(create_test_message("m1", "a@example.com", "Old subject"))
        .await
        .unwrap();

    let mut source = MockMailSource::new();
    source
        .expect_list_message_ids()
        .returning(|_, _| Ok(vec!["m1".to_string()]));
    source.expect_get_message().returning(|id| {
        let mut record = create_test_message(id, "a@example.com", "New subject");
        record.is_read = true;
        Ok(record)
    });

    Synchronizer::new(Arc::new(source), &sync_config())
        .sync(&store)
        .await
        .unwrap();

    let record = store.get("m1").await.unwrap().unwrap();
    assert_eq!(record.subject, "New subject");
    assert!(record.is_read);
    assert_eq!(store.len().await.unwrap(), 1);
}
