//! Key/value persistence behind the entity stores.
//!
//! Every collection is stored as one JSON array under a fixed key together
//! with a monotonic revision. Writes are compare-and-set on that revision so
//! two processes sharing a workspace cannot silently overwrite each other.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::db;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub payload: String,
    pub revision: u64,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded writing {key}: {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("revision conflict on {key}: expected {expected}, found {found}")]
    Conflict {
        key: String,
        expected: u64,
        found: u64,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub trait Storage {
    /// Short backend name reported by `health`.
    fn kind(&self) -> &'static str;

    fn get(&self, key: &str) -> Result<Option<StoredBlob>, StorageError>;

    /// Writes `payload` when the stored revision still equals `expected`
    /// (0 for an absent key) and returns the new revision.
    fn put(&mut self, key: &str, payload: &str, expected: u64) -> Result<u64, StorageError>;

    fn remove(&mut self, key: &str) -> Result<bool, StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Process-local backend. An optional byte quota mimics browser storage limits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, StoredBlob>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.payload.len())
            .sum()
    }
}

impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<StoredBlob>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, payload: &str, expected: u64) -> Result<u64, StorageError> {
        let found = self.entries.get(key).map(|b| b.revision).unwrap_or(0);
        if found != expected {
            return Err(StorageError::Conflict {
                key: key.to_string(),
                expected,
                found,
            });
        }
        if let Some(quota) = self.quota_bytes {
            let used = self.used_bytes_excluding(key);
            let needed = key.len() + payload.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        let revision = found + 1;
        self.entries.insert(
            key.to_string(),
            StoredBlob {
                payload: payload.to_string(),
                revision,
            },
        );
        Ok(revision)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Workspace-backed storage in `<workspace>/school.sqlite3`.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }
}

impl Storage for SqliteStorage {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &str) -> Result<Option<StoredBlob>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT payload, revision FROM collections WHERE key = ?",
                [key],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)),
            )
            .optional()?;
        Ok(row.map(|(payload, revision)| StoredBlob {
            payload,
            revision: revision.max(0) as u64,
        }))
    }

    fn put(&mut self, key: &str, payload: &str, expected: u64) -> Result<u64, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let found: u64 = tx
            .query_row(
                "SELECT revision FROM collections WHERE key = ?",
                [key],
                |r| r.get::<_, i64>(0),
            )
            .optional()?
            .map(|v| v.max(0) as u64)
            .unwrap_or(0);
        if found != expected {
            return Err(StorageError::Conflict {
                key: key.to_string(),
                expected,
                found,
            });
        }
        let revision = found + 1;
        tx.execute(
            "INSERT INTO collections(key, payload, revision, updated_at)
             VALUES(?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))
             ON CONFLICT(key) DO UPDATE SET
               payload = excluded.payload,
               revision = excluded.revision,
               updated_at = excluded.updated_at",
            (key, payload, revision as i64),
        )?;
        tx.commit()?;
        Ok(revision)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        let n = self
            .conn
            .execute("DELETE FROM collections WHERE key = ?", [key])?;
        Ok(n > 0)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM collections ORDER BY key")?;
        let keys = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}
