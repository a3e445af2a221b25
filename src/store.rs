//! Local message store keyed by message ID

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::MessageRecord;

#[cfg(feature = "cache")]
pub use sqlite::SqliteStore;

/// Persistent cache of synced messages
///
/// `upsert` replaces any record with the same `message_id`. Read failures
/// surface as `SourceUnavailable`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn upsert(&self, record: MessageRecord) -> Result<()>;

    async fn get(&self, message_id: &str) -> Result<Option<MessageRecord>>;

    /// All records, ordered by message ID
    async fn all(&self) -> Result<Vec<MessageRecord>>;

    async fn len(&self) -> Result<usize>;
}

/// In-memory store, used for tests and dry runs without a cache file
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, MessageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn upsert(&self, record: MessageRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.message_id.clone(), record);
        Ok(())
    }

    async fn get(&self, message_id: &str) -> Result<Option<MessageRecord>> {
        Ok(self.records.read().await.get(message_id).cloned())
    }

    async fn all(&self) -> Result<Vec<MessageRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(feature = "cache")]
mod sqlite {
    use super::*;
    use chrono::{DateTime, Utc};
    use rusqlite::{params, Connection, OptionalExtension};
    use std::collections::BTreeSet;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tracing::{debug, info};

    use crate::error::GmailError;

    const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS emails (
        message_id TEXT PRIMARY KEY,
        thread_id TEXT NOT NULL,
        from_email TEXT NOT NULL,
        to_email TEXT NOT NULL,
        subject TEXT NOT NULL,
        received_date TEXT NOT NULL,
        body TEXT NOT NULL,
        is_read INTEGER NOT NULL,
        labels TEXT NOT NULL
    );";

    const SELECT_COLUMNS: &str = "SELECT message_id, thread_id, from_email, to_email, subject,
            received_date, body, is_read, labels
         FROM emails";

    /// SQLite-backed store
    ///
    /// `rusqlite::Connection` is `!Sync`, so access is serialized behind a
    /// mutex. Queries block, so each one runs on tokio's blocking pool.
    pub struct SqliteStore {
        conn: Arc<Mutex<Connection>>,
    }

    impl SqliteStore {
        /// Open (or create) the database at `path`
        pub fn open(path: &Path) -> Result<Self> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            let conn = Connection::open(path)?;
            conn.execute_batch(SCHEMA)?;
            info!("Opened message store at {:?}", path);
            Ok(Self::from_connection(conn))
        }

        pub fn open_in_memory() -> Result<Self> {
            let conn = Connection::open_in_memory()?;
            conn.execute_batch(SCHEMA)?;
            Ok(Self::from_connection(conn))
        }

        fn from_connection(conn: Connection) -> Self {
            Self {
                conn: Arc::new(Mutex::new(conn)),
            }
        }

        async fn with_conn<T, F>(&self, f: F) -> Result<T>
        where
            F: FnOnce(&Connection) -> Result<T> + Send + 'static,
            T: Send + 'static,
        {
            let conn = Arc::clone(&self.conn);
            tokio::task::spawn_blocking(move || {
                let guard = conn.lock().map_err(|_| {
                    GmailError::StoreError("store connection lock poisoned".to_string())
                })?;
                f(&guard)
            })
            .await
            .map_err(|e| GmailError::StoreError(format!("store task failed: {}", e)))?
        }
    }

    fn unavailable(e: impl std::fmt::Display) -> GmailError {
        GmailError::SourceUnavailable(format!("message store read failed: {}", e))
    }

    /// Raw column values; decoded outside the rusqlite row callback
    struct Row {
        message_id: String,
        thread_id: String,
        from: String,
        to: String,
        subject: String,
        received_date: String,
        body: String,
        is_read: bool,
        labels: String,
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
        Ok(Row {
            message_id: row.get(0)?,
            thread_id: row.get(1)?,
            from: row.get(2)?,
            to: row.get(3)?,
            subject: row.get(4)?,
            received_date: row.get(5)?,
            body: row.get(6)?,
            is_read: row.get(7)?,
            labels: row.get(8)?,
        })
    }

    fn into_record(row: Row) -> Result<MessageRecord> {
        let received_date = DateTime::parse_from_rfc3339(&row.received_date)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                unavailable(format!("bad received_date for {}: {}", row.message_id, e))
            })?;
        let labels: BTreeSet<String> = serde_json::from_str(&row.labels)
            .map_err(|e| unavailable(format!("bad labels for {}: {}", row.message_id, e)))?;

        Ok(MessageRecord {
            message_id: row.message_id,
            thread_id: row.thread_id,
            from: row.from,
            to: row.to,
            subject: row.subject,
            received_date,
            body: row.body,
            is_read: row.is_read,
            labels,
        })
    }

    #[async_trait]
    impl MessageStore for SqliteStore {
        async fn upsert(&self, record: MessageRecord) -> Result<()> {
            let labels = serde_json::to_string(&record.labels)?;
            self.with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO emails (message_id, thread_id, from_email, to_email, subject,
                        received_date, body, is_read, labels)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT(message_id) DO UPDATE SET
                        thread_id = excluded.thread_id,
                        from_email = excluded.from_email,
                        to_email = excluded.to_email,
                        subject = excluded.subject,
                        received_date = excluded.received_date,
                        body = excluded.body,
                        is_read = excluded.is_read,
                        labels = excluded.labels",
                    params![
                        record.message_id,
                        record.thread_id,
                        record.from,
                        record.to,
                        record.subject,
                        record.received_date.to_rfc3339(),
                        record.body,
                        record.is_read,
                        labels,
                    ],
                )?;
                debug!("Upserted message {}", record.message_id);
                Ok(())
            })
            .await
        }

        async fn get(&self, message_id: &str) -> Result<Option<MessageRecord>> {
            let message_id = message_id.to_string();
            let row = self
                .with_conn(move |conn| {
                    conn.query_row(
                        &format!("{} WHERE message_id = ?1", SELECT_COLUMNS),
                        params![message_id],
                        read_row,
                    )
                    .optional()
                    .map_err(unavailable)
                })
                .await?;
            row.map(into_record).transpose()
        }

        async fn all(&self) -> Result<Vec<MessageRecord>> {
            let rows = self
                .with_conn(|conn| {
                    let mut stmt = conn
                        .prepare(&format!("{} ORDER BY message_id", SELECT_COLUMNS))
                        .map_err(unavailable)?;
                    let rows = stmt
                        .query_map([], read_row)
                        .map_err(unavailable)?
                        .collect::<rusqlite::Result<Vec<_>>>()
                        .map_err(unavailable)?;
                    Ok(rows)
                })
                .await?;
            rows.into_iter().map(into_record).collect()
        }

        async fn len(&self) -> Result<usize> {
            let count: i64 = self
                .with_conn(|conn| {
                    conn.query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))
                        .map_err(unavailable)
                })
                .await?;
            Ok(count as usize)
        }
    }
}
