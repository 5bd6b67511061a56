use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Storage key for the persisted speed history record.
pub const HISTORY_KEY: &str = "typingSpeedHistory";
/// Storage key for the persisted key-frequency record.
pub const KEY_PRESS_KEY: &str = "keyPressData";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("state encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("state directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key-value collaborator for telemetry records. Each put rewrites
/// the whole record stored under its key; last writer wins.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// Store backed by a single-table sqlite database.
#[derive(Debug)]
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open the platform-default state database.
    pub fn open_default() -> Result<Self, StoreError> {
        match crate::app_dirs::AppDirs::state_db_path() {
            Some(path) => Self::open(&path),
            None => Self::open(Path::new("keytempo_state.db")),
        }
    }

    /// Ephemeral store for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SqliteStateStore { conn })
    }
}

impl StateStore for SqliteStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM state WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO state (key, value) VALUES (?1, ?2)",
            params![key, raw],
        )?;
        Ok(())
    }
}

/// In-memory store, handy where durability is unwanted.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}
