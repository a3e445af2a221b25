//! Mailbox synchronization into the local store

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::MailSource;
use crate::config::SyncConfig;
use crate::error::{GmailError, Result};
use crate::store::MessageStore;

/// Result of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub listed: usize,
    pub stored: usize,
    pub failed_message_ids: Vec<String>,
}

/// Copies messages from a mail source into a message store
pub struct Synchronizer {
    source: Arc<dyn MailSource>,
    query: String,
    max_results: u32,
    concurrency: usize,
}

impl Synchronizer {
    pub fn new(source: Arc<dyn MailSource>, config: &SyncConfig) -> Self {
        Self {
            source,
            query: config.query.clone(),
            max_results: config.max_results,
            concurrency: config.max_concurrent_requests.max(1),
        }
    }

    /// List, fetch and upsert.
    ///
    /// A listing failure aborts with `SourceUnavailable`. Messages that fail to
    /// fetch or store are skipped and reported.
    pub async fn sync(&self, store: &dyn MessageStore) -> Result<SyncReport> {
        let ids = self
            .source
            .list_message_ids(&self.query, self.max_results)
            .await
            .map_err(|e| GmailError::SourceUnavailable(format!("listing messages failed: {}", e)))?;

        info!(
            "Fetching {} messages with {} concurrent workers",
            ids.len(),
            self.concurrency
        );

        let mut report = SyncReport {
            listed: ids.len(),
            ..SyncReport::default()
        };

        let results: Vec<(String, Result<()>)> = stream::iter(ids)
            .map(|id| {
                let source = &self.source;
                async move {
                    debug!("Fetching message: {}", id);
                    let result = match source.get_message(&id).await {
                        Ok(record) => store.upsert(record).await,
                        Err(e) => Err(e),
                    };
                    (id, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (id, result) in results {
            match result {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    warn!("Skipping message {}: {}", id, e);
                    report.failed_message_ids.push(id);
                }
            }
        }
        report.failed_message_ids.sort();

        info!(
            "Synced {}/{} messages ({} failed)",
            report.stored,
            report.listed,
            report.failed_message_ids.len()
        );
        Ok(report)
    }
}
