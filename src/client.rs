//! Mail source/sink traits and the Gmail-backed implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use google_gmail1::api::{Label, Message, MessagePart, ModifyMessageRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::auth::GmailHub;
use crate::error::{GmailError, Result};
use crate::models::{LabelInfo, LabelModification, MessageRecord, UNREAD_LABEL};

const MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";
const LABELS_SCOPE: &str = "https://www.googleapis.com/auth/gmail.labels";

/// Gmail caps `messages.list` page size at 500
const MAX_PAGE_SIZE: u32 = 500;

/// Read side of the mail service
#[async_trait]
pub trait MailSource: Send + Sync {
    /// List up to `max_results` message IDs matching a search query
    async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>>;

    /// Fetch one full message
    async fn get_message(&self, id: &str) -> Result<MessageRecord>;
}

/// Write side of the mail service
#[async_trait]
pub trait MailSink: Send + Sync {
    /// Add and remove labels on one message in a single request
    async fn modify_labels(&self, message_id: &str, modification: &LabelModification) -> Result<()>;

    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;

    /// Create a new label, returning its ID
    async fn create_label(&self, name: &str) -> Result<String>;
}

/// Production Gmail client with rate limiting and retry logic
///
/// This implementation includes:
/// - Semaphore-based limit on in-flight requests
/// - Exponential backoff retry for transient errors
/// - Timeouts on listing calls
pub struct ProductionGmailClient {
    hub: GmailHub,
    rate_limiter: Arc<Semaphore>,
}

impl ProductionGmailClient {
    /// Create a new production Gmail client
    ///
    /// # Arguments
    /// * `hub` - Gmail API hub instance
    /// * `max_concurrent` - Maximum concurrent requests (typically 40-50)
    pub fn new(hub: GmailHub, max_concurrent: usize) -> Self {
        Self {
            hub,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    async fn acquire_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.rate_limiter.acquire().await.map_err(|e| {
            GmailError::ApiError(format!("Failed to acquire rate limit permit: {}", e))
        })
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempts <= max_retries => {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MailSource for ProductionGmailClient {
    async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        let mut all_ids = Vec::new();
        let mut page_token: Option<String> = None;

        while (all_ids.len() as u32) < max_results {
            let remaining = max_results - all_ids.len() as u32;
            let page_token_ref = page_token.clone();

            let response = Self::with_retry("list_message_ids", 3, || {
                let page_token = page_token_ref.clone();
                async move {
                    let _permit = self.acquire_permit().await?;

                    let mut call = self
                        .hub
                        .users()
                        .messages_list("me")
                        .max_results(remaining.min(MAX_PAGE_SIZE));
                    if !query.is_empty() {
                        call = call.q(query);
                    }
                    if let Some(token) = page_token.as_ref() {
                        call = call.page_token(token);
                    }

                    let timeout_duration = Duration::from_secs(30);
                    match tokio::time::timeout(timeout_duration, call.add_scope(MODIFY_SCOPE).doit())
                        .await
                    {
                        Ok(result) => Ok(result?.1),
                        Err(_) => Err(GmailError::NetworkError(format!(
                            "API call timed out after {:?}",
                            timeout_duration
                        ))),
                    }
                }
            })
            .await?;

            for msg_ref in response.messages.unwrap_or_default() {
                if let Some(id) = msg_ref.id {
                    all_ids.push(id);
                }
            }

            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        all_ids.truncate(max_results as usize);
        debug!("Listed {} message IDs for query '{}'", all_ids.len(), query);
        Ok(all_ids)
    }

    async fn get_message(&self, id: &str) -> Result<MessageRecord> {
        Self::with_retry("get_message", 3, || async {
            let _permit = self.acquire_permit().await?;

            let (_, msg) = self
                .hub
                .users()
                .messages_get("me", id)
                .format("full")
                .add_scope(MODIFY_SCOPE)
                .doit()
                .await?;

            parse_message(msg)
        })
        .await
    }
}

#[async_trait]
impl MailSink for ProductionGmailClient {
    async fn modify_labels(&self, message_id: &str, modification: &LabelModification) -> Result<()> {
        let request = ModifyMessageRequest {
            add_label_ids: (!modification.add.is_empty()).then(|| modification.add.clone()),
            remove_label_ids: (!modification.remove.is_empty()).then(|| modification.remove.clone()),
        };

        Self::with_retry("modify_labels", 3, || async {
            let _permit = self.acquire_permit().await?;

            self.hub
                .users()
                .messages_modify(request.clone(), "me", message_id)
                .add_scope(MODIFY_SCOPE)
                .doit()
                .await?;

            Ok(())
        })
        .await
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        Self::with_retry("list_labels", 3, || async {
            let _permit = self.acquire_permit().await?;

            // Wrap API call in timeout to prevent indefinite hangs
            let timeout_duration = Duration::from_secs(30);
            let api_call = self
                .hub
                .users()
                .labels_list("me")
                .add_scope(LABELS_SCOPE)
                .doit();

            let (_, response) = match tokio::time::timeout(timeout_duration, api_call).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("Gmail API list_labels call timed out after {:?}", timeout_duration);
                    return Err(GmailError::NetworkError(format!(
                        "API call timed out after {:?}",
                        timeout_duration
                    )));
                }
            };

            let labels: Vec<LabelInfo> = response
                .labels
                .unwrap_or_default()
                .into_iter()
                .filter_map(|label| match (label.id, label.name) {
                    (Some(id), Some(name)) => Some(LabelInfo { id, name }),
                    _ => None,
                })
                .collect();

            debug!("Successfully parsed {} labels", labels.len());
            Ok(labels)
        })
        .await
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        Self::with_retry("create_label", 3, || async {
            let _permit = self.acquire_permit().await?;

            let label = Label {
                name: Some(name.to_string()),
                message_list_visibility: Some("show".to_string()),
                label_list_visibility: Some("labelShow".to_string()),
                ..Default::default()
            };

            let (_, created_label) = self
                .hub
                .users()
                .labels_create(label, "me")
                .add_scope(LABELS_SCOPE)
                .doit()
                .await?;

            created_label
                .id
                .ok_or_else(|| GmailError::LabelError("Created label has no ID".to_string()))
        })
        .await
    }
}

/// Convert a full-format Gmail API message into a `MessageRecord`
fn parse_message(msg: Message) -> Result<MessageRecord> {
    let message_id = msg
        .id
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing message ID".to_string()))?;

    let thread_id = msg
        .thread_id
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing thread ID".to_string()))?;

    let labels = msg.label_ids.unwrap_or_default();
    let is_read = !labels.iter().any(|l| l == UNREAD_LABEL);

    let payload = msg
        .payload
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing payload".to_string()))?;

    let mut from = String::new();
    let mut to = String::new();
    let mut subject = String::new();
    let mut date_str = String::new();

    for header in payload.headers.iter().flatten() {
        if let (Some(name), Some(value)) = (&header.name, &header.value) {
            match name.to_lowercase().as_str() {
                "from" => from = value.clone(),
                "to" => to = value.clone(),
                "subject" => subject = value.clone(),
                "date" => date_str = value.clone(),
                _ => {}
            }
        }
    }

    let received_date = match parse_date(&date_str) {
        Ok(date) => date,
        Err(e) => msg
            .internal_date
            .and_then(DateTime::from_timestamp_millis)
            .ok_or(e)?,
    };

    let body = extract_plain_text(&payload).unwrap_or_default();

    Ok(MessageRecord {
        message_id,
        thread_id,
        from,
        to,
        subject,
        received_date,
        body,
        is_read,
        labels: labels.into_iter().collect(),
    })
}

/// Find the first `text/plain` body, descending into multipart parts.
/// Single-part messages use the top-level body whatever its type.
fn extract_plain_text(part: &MessagePart) -> Option<String> {
    match &part.parts {
        Some(parts) if !parts.is_empty() => parts.iter().find_map(|child| {
            let is_plain = child.mime_type.as_deref() == Some("text/plain");
            let has_children = child.parts.as_ref().is_some_and(|p| !p.is_empty());
            if is_plain || has_children {
                extract_plain_text(child)
            } else {
                None
            }
        }),
        _ => part
            .body
            .as_ref()
            .and_then(|body| body.data.as_ref())
            .map(|data| String::from_utf8_lossy(data).into_owned()),
    }
}

/// Parse RFC 2822 date string
fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(date_str)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Fallback to RFC 3339 format
            DateTime::parse_from_rfc3339(date_str).map(|dt| dt.with_timezone(&Utc))
        })
        .map_err(|e| GmailError::InvalidMessageFormat(format!("Invalid date format: {}", e)))
}
