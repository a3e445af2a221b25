//! Common test utilities and fixtures
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use gmail_rules::client::{MailSink, MailSource};
use gmail_rules::error::Result;
use gmail_rules::models::{LabelInfo, LabelModification, MessageRecord};
use mockall::mock;

/// Fixed "now" used across integration tests
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
}

/// Create a test message with default values
pub fn create_test_message(id: &str, from: &str, subject: &str) -> MessageRecord {
    MessageRecord {
        message_id: id.to_string(),
        thread_id: format!("thread_{}", id),
        from: from.to_string(),
        to: "me@example.com".to_string(),
        subject: subject.to_string(),
        received_date: Utc.with_ymd_and_hms(2024, 1, 30, 8, 0, 0).unwrap(),
        body: String::new(),
        is_read: false,
        labels: ["INBOX", "UNREAD"].iter().map(|s| s.to_string()).collect(),
    }
}

/// Create a message received at `received`
pub fn create_dated_message(id: &str, subject: &str, received: DateTime<Utc>) -> MessageRecord {
    MessageRecord {
        received_date: received,
        ..create_test_message(id, "sender@example.com", subject)
    }
}

/// Create a test LabelInfo
pub fn create_test_label_info(id: &str, name: &str) -> LabelInfo {
    LabelInfo {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// Write a ruleset document to a temp dir and return the path
pub async fn write_ruleset(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("rules.json");
    tokio::fs::write(&path, json).await.unwrap();
    path
}

// Mock implementation of the read side
mock! {
    pub MailSource {}

    #[async_trait::async_trait]
    impl MailSource for MailSource {
        async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>>;
        async fn get_message(&self, id: &str) -> Result<MessageRecord>;
    }
}

// Mock implementation of the write side
mock! {
    pub MailSink {}

    #[async_trait::async_trait]
    impl MailSink for MailSink {
        async fn modify_labels(&self, message_id: &str, modification: &LabelModification) -> Result<()>;
        async fn list_labels(&self) -> Result<Vec<LabelInfo>>;
        async fn create_label(&self, name: &str) -> Result<String>;
    }
}
