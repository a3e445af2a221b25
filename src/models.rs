use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Gmail system label marking a message as unread
pub const UNREAD_LABEL: &str = "UNREAD";

/// Gmail system label for messages shown in the inbox
pub const INBOX_LABEL: &str = "INBOX";

/// Snapshot of one mail message as stored locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: String,
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub received_date: DateTime<Utc>,
    #[serde(default)]
    pub body: String,
    pub is_read: bool,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl MessageRecord {
    /// Check whether the message currently carries `label_id`
    pub fn has_label(&self, label_id: &str) -> bool {
        self.labels.contains(label_id)
    }
}

/// Label info returned from the mail service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// A single label mutation request against one message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelModification {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl LabelModification {
    pub fn add(label_id: impl Into<String>) -> Self {
        Self {
            add: vec![label_id.into()],
            remove: Vec::new(),
        }
    }

    pub fn remove(label_id: impl Into<String>) -> Self {
        Self {
            add: Vec::new(),
            remove: vec![label_id.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}
