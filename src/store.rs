use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver};
use rusqlite::{params, Connection, OptionalExtension};

use crate::chat::ChatMessage;

/// Append-only shared feed. Implementations assign ids and timestamps.
pub(crate) trait MessageStore: Send + Sync {
    /// Writes one message and returns the store-assigned id once accepted.
    fn append(&self, user: &str, text: &str) -> Result<String>;

    /// Full feed ordered by timestamp, ties broken by insertion sequence.
    /// Messages still waiting for a timestamp sort last.
    fn snapshot(&self) -> Result<Vec<ChatMessage>>;
}

/// Single-document reads keyed by `collection/document`.
pub(crate) trait SecretStore: Send + Sync {
    fn read_secret(&self, collection: &str, document: &str) -> Result<Option<String>>;
}

pub(crate) struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create store dir {}", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("open chat store {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.busy_timeout(Duration::from_secs(2))
            .context("set busy timeout")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS messages (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user TEXT NOT NULL,
              text TEXT NOT NULL,
              created_at INTEGER DEFAULT (CAST(unixepoch('subsec') * 1000 AS INTEGER))
            );
            CREATE INDEX IF NOT EXISTS idx_messages_created_at_id
              ON messages(created_at, id);
            CREATE TABLE IF NOT EXISTS secrets (
              collection TEXT NOT NULL,
              document TEXT NOT NULL,
              key TEXT NOT NULL,
              PRIMARY KEY (collection, document)
            );
            ",
        )
        .context("init chat schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn put_secret(&self, collection: &str, document: &str, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO secrets(collection, document, key) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, document) DO UPDATE SET key = excluded.key",
            params![collection, document, key],
        )
        .context("upsert secret")?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("chat store connection poisoned"))
    }
}

impl MessageStore for SqliteStore {
    fn append(&self, user: &str, text: &str) -> Result<String> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages(user, text) VALUES (?1, ?2)",
            params![user, text],
        )
        .context("insert message")?;
        Ok(conn.last_insert_rowid().to_string())
    }

    fn snapshot(&self) -> Result<Vec<ChatMessage>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, user, text, created_at
                 FROM messages
                 ORDER BY created_at IS NULL, created_at ASC, id ASC",
            )
            .context("prepare snapshot")?;

        let mut rows = stmt.query([]).context("query snapshot")?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().context("scan snapshot row")? {
            let id: i64 = row.get(0).context("snapshot.id")?;
            let created_at: Option<i64> = row.get(3).context("snapshot.created_at")?;
            out.push(ChatMessage {
                id: id.to_string(),
                timestamp: created_at.and_then(DateTime::<Utc>::from_timestamp_millis),
                user: row.get(1).context("snapshot.user")?,
                text: row.get(2).context("snapshot.text")?,
            });
        }
        Ok(out)
    }
}

impl SecretStore for SqliteStore {
    fn read_secret(&self, collection: &str, document: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let key = conn
            .query_row(
                "SELECT key FROM secrets WHERE collection = ?1 AND document = ?2",
                params![collection, document],
                |row| row.get(0),
            )
            .optional()
            .context("read secret")?;
        Ok(key)
    }
}

pub(crate) fn default_store_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".chattograph").join("chat.db")
    } else {
        PathBuf::from(".chattograph").join("chat.db")
    }
}

/// Live feed handle. Dropping it stops the poller.
pub(crate) struct Subscription {
    rx: Receiver<Vec<ChatMessage>>,
    stop: Arc<AtomicBool>,
}

impl Subscription {
    pub(crate) fn receiver(&self) -> &Receiver<Vec<ChatMessage>> {
        &self.rx
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Polls `store` on a background thread and delivers a full snapshot whenever
/// the set of message ids changes. The first poll is always delivered.
pub(crate) fn subscribe(store: Arc<dyn MessageStore>, interval: Duration) -> Subscription {
    let (tx, rx) = unbounded::<Vec<ChatMessage>>();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    std::thread::spawn(move || {
        let mut last_ids: Option<Vec<String>> = None;
        while !stop_flag.load(Ordering::Relaxed) {
            match store.snapshot() {
                Ok(snapshot) => {
                    let ids = snapshot.iter().map(|m| m.id.clone()).collect::<Vec<_>>();
                    if last_ids.as_ref() != Some(&ids) {
                        if tx.send(snapshot).is_err() {
                            break;
                        }
                        last_ids = Some(ids);
                    }
                }
                Err(err) => tracing::warn!(error = %err, "feed snapshot failed"),
            }
            std::thread::sleep(interval);
        }
        tracing::debug!("feed poller stopped");
    });
    Subscription { rx, stop }
}
