//! Translation of rule actions into label mutations against the mail sink

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::MailSink;
use crate::error::{GmailError, Result};
use crate::label_manager::LabelManager;
use crate::models::{LabelModification, INBOX_LABEL, UNREAD_LABEL};
use crate::rules::{ActionKind, RuleAction, DESTINATION_PARAM};

/// Applies one action at a time to one message.
///
/// Every action becomes exactly one `modify_labels` request; nothing is
/// batched or deduplicated, so applying `mark_as_read` twice sends two
/// identical requests. Local records are not touched; the next sync picks up
/// the new label state.
pub struct ActionApplier {
    sink: Arc<dyn MailSink>,
    labels: LabelManager,
    timeout: Duration,
    dry_run: bool,
}

impl ActionApplier {
    pub fn new(sink: Arc<dyn MailSink>, timeout: Duration) -> Self {
        Self {
            labels: LabelManager::new(Arc::clone(&sink), false),
            sink,
            timeout,
            dry_run: false,
        }
    }

    /// Log modifications instead of sending them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Create `move_message` destinations that have no matching label
    pub fn with_create_missing_labels(mut self, create_missing: bool) -> Self {
        self.labels = LabelManager::new(Arc::clone(&self.sink), create_missing);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Apply `action` to `message_id` and return the modification that was
    /// sent (or would have been, in dry-run mode).
    ///
    /// The timeout covers the whole attempt, destination lookup included.
    pub async fn apply(&self, action: &RuleAction, message_id: &str) -> Result<LabelModification> {
        match tokio::time::timeout(self.timeout, self.send(action, message_id)).await {
            Ok(Ok(modification)) => Ok(modification),
            Ok(Err(e @ GmailError::MissingParameter { .. })) => Err(e),
            Ok(Err(e)) => Err(action_failed(action.kind, message_id, e)),
            Err(_) => Err(action_failed(
                action.kind,
                message_id,
                GmailError::NetworkError(format!("Request timed out after {:?}", self.timeout)),
            )),
        }
    }

    async fn send(&self, action: &RuleAction, message_id: &str) -> Result<LabelModification> {
        let modification = match action.kind {
            ActionKind::MarkRead => LabelModification::remove(UNREAD_LABEL),
            ActionKind::MarkUnread => LabelModification::add(UNREAD_LABEL),
            ActionKind::MoveMessage => {
                let destination = action
                    .destination()
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| GmailError::MissingParameter {
                        action: action.kind.to_string(),
                        parameter: DESTINATION_PARAM.to_string(),
                    })?;

                LabelModification {
                    add: vec![self.labels.resolve(destination, !self.dry_run).await?],
                    remove: vec![INBOX_LABEL.to_string()],
                }
            }
        };

        if self.dry_run {
            info!(
                "[DRY RUN] Would apply {} to {} (add {:?}, remove {:?})",
                action.kind, message_id, modification.add, modification.remove
            );
            return Ok(modification);
        }

        self.sink.modify_labels(message_id, &modification).await?;
        debug!("Applied {} to {}", action.kind, message_id);
        Ok(modification)
    }
}

fn action_failed(kind: ActionKind, message_id: &str, source: GmailError) -> GmailError {
    GmailError::ActionFailed {
        action: kind.to_string(),
        message_id: message_id.to_string(),
        source: Box::new(source),
    }
}
