//! Resolution of `move_message` destinations to Gmail label IDs
use crate::client::MailSink;
use crate::error::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Snapshot of the account's labels, loaded on first use
#[derive(Default)]
struct LabelCache {
    ids: HashSet<String>,
    /// lowercase name -> id
    by_name: HashMap<String, String>,
}

impl LabelCache {
    fn insert(&mut self, name: &str, id: String) {
        self.by_name.insert(name.to_lowercase(), id.clone());
        self.ids.insert(id);
    }

    fn lookup(&self, destination: &str) -> Option<String> {
        if self.ids.contains(destination) {
            return Some(destination.to_string());
        }
        self.by_name.get(&destination.to_lowercase()).cloned()
    }
}

/// Maps destination names to label IDs, creating missing labels on request
///
/// A destination is resolved in this order:
/// 1. an existing label ID (e.g. `Label_42`, `STARRED`) is used as is
/// 2. an existing label name, compared case-insensitively
/// 3. a newly created label, when `create_missing` is enabled
/// 4. otherwise the destination string itself
///
/// The label list is fetched once and shared across concurrent callers.
pub struct LabelManager {
    sink: Arc<dyn MailSink>,
    create_missing: bool,
    cache: Mutex<Option<LabelCache>>,
}

impl LabelManager {
    pub fn new(sink: Arc<dyn MailSink>, create_missing: bool) -> Self {
        Self {
            sink,
            create_missing,
            cache: Mutex::new(None),
        }
    }

    /// Resolve `destination` to a label ID.
    ///
    /// `allow_create` gates label creation on top of `create_missing`; dry
    /// runs pass `false` so nothing in the mailbox changes.
    pub async fn resolve(&self, destination: &str, allow_create: bool) -> Result<String> {
        if let Some(id) = self.lookup(destination).await? {
            debug!("Resolved destination '{}' to label {}", destination, id);
            return Ok(id);
        }

        if self.create_missing && allow_create {
            // The cache lock is not held here; a concurrent caller may create
            // the same label first, in which case its entry wins.
            return match self.sink.create_label(destination).await {
                Ok(id) => {
                    info!("Created label '{}' with ID {}", destination, id);
                    let mut guard = self.cache.lock().await;
                    let cache = guard.get_or_insert_with(LabelCache::default);
                    cache.insert(destination, id.clone());
                    Ok(id)
                }
                Err(e) => match self.lookup(destination).await? {
                    Some(id) => Ok(id),
                    None => Err(e),
                },
            };
        }

        warn!(
            "No label named '{}' exists; passing the destination through unchanged",
            destination
        );
        Ok(destination.to_string())
    }

    /// Look `destination` up, loading the label list on first use
    async fn lookup(&self, destination: &str) -> Result<Option<String>> {
        let mut guard = self.cache.lock().await;

        if guard.is_none() {
            let labels = self.sink.list_labels().await?;
            let mut cache = LabelCache::default();
            for label in &labels {
                cache.insert(&label.name, label.id.clone());
            }
            info!("Loaded {} existing labels into cache", labels.len());
            *guard = Some(cache);
        }

        Ok(guard.as_ref().and_then(|cache| cache.lookup(destination)))
    }
}
