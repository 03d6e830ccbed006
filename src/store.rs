//! Generic entity store: one collection, its defaults, and its persistence.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{Storage, StorageError};

/// How a collection mints ids for new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// `SS001`, `TCH012`: highest existing numeric suffix + 1.
    Prefixed { prefix: &'static str, width: usize },
    /// Bare numbers: highest existing + 1.
    Sequence,
    /// Unix milliseconds, bumped until unused.
    Timestamp,
    Uuid,
}

pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Lowercase noun used in error messages and export file names.
    const KIND: &'static str;
    const STORAGE_KEY: &'static str;
    const ID_SCHEME: IdScheme;
    /// Messages and contacts list newest first.
    const NEWEST_FIRST: bool = false;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn defaults() -> Vec<Self>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid {kind} data: {reason}")]
    Invalid { kind: &'static str, reason: String },

    #[error("{key} changed since revision {expected} (now at {found})")]
    Conflict {
        key: String,
        expected: u64,
        found: u64,
    },
}

pub struct Collection<T: Entity> {
    key: String,
    items: Vec<T>,
    revision: u64,
    degraded: Option<String>,
}

impl<T: Entity> Collection<T> {
    /// Reads the collection from storage, falling back to the entity's
    /// defaults when the key is absent or its payload does not parse.
    pub fn load(storage: &dyn Storage) -> Self {
        let key = T::STORAGE_KEY.to_string();
        match storage.get(&key) {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<T>>(&blob.payload) {
                Ok(items) => Self {
                    key,
                    items,
                    revision: blob.revision,
                    degraded: None,
                },
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "stored collection unreadable; using defaults");
                    Self {
                        key,
                        items: T::defaults(),
                        revision: blob.revision,
                        degraded: None,
                    }
                }
            },
            Ok(None) => Self {
                key,
                items: T::defaults(),
                revision: 0,
                degraded: None,
            },
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "storage read failed; using defaults");
                Self {
                    key,
                    items: T::defaults(),
                    revision: 0,
                    degraded: Some(e.to_string()),
                }
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Set while the last write failed and the in-memory copy is ahead of storage.
    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|r| r.id() == id)
    }

    pub fn check_revision(&self, expected: Option<u64>) -> Result<(), StoreError> {
        match expected {
            Some(expected) if expected != self.revision => Err(StoreError::Conflict {
                key: self.key.clone(),
                expected,
                found: self.revision,
            }),
            _ => Ok(()),
        }
    }

    pub fn add(
        &mut self,
        storage: &mut dyn Storage,
        mut record: T,
        now_ms: i64,
    ) -> Result<T, StoreError> {
        record.set_id(next_id(&self.items, T::ID_SCHEME, now_ms));
        let mut next = self.items.clone();
        if T::NEWEST_FIRST {
            next.insert(0, record.clone());
        } else {
            next.push(record.clone());
        }
        self.commit(storage, next)?;
        Ok(record)
    }

    /// Shallow-merges `patch` onto the record with `id`. The id itself never changes.
    pub fn update(
        &mut self,
        storage: &mut dyn Storage,
        id: &str,
        patch: &Map<String, Value>,
    ) -> Result<T, StoreError> {
        let idx = self.position(id)?;
        let merged = apply_patch(&self.items[idx], patch)?;
        let mut next = self.items.clone();
        next[idx] = merged.clone();
        self.commit(storage, next)?;
        Ok(merged)
    }

    /// In-place edit for status transitions and other field-level changes.
    pub fn modify(
        &mut self,
        storage: &mut dyn Storage,
        id: &str,
        f: impl FnOnce(&mut T),
    ) -> Result<T, StoreError> {
        let idx = self.position(id)?;
        let mut next = self.items.clone();
        f(&mut next[idx]);
        next[idx].set_id(id.to_string());
        let changed = next[idx].clone();
        self.commit(storage, next)?;
        Ok(changed)
    }

    /// Applies `f` to every record matching `pred`; returns how many changed.
    pub fn modify_where(
        &mut self,
        storage: &mut dyn Storage,
        pred: impl Fn(&T) -> bool,
        f: impl Fn(&mut T),
    ) -> Result<usize, StoreError> {
        let mut next = self.items.clone();
        let mut touched = 0usize;
        for r in next.iter_mut().filter(|r| pred(r)) {
            f(r);
            touched += 1;
        }
        if touched == 0 {
            return Ok(0);
        }
        self.commit(storage, next)?;
        Ok(touched)
    }

    pub fn delete(&mut self, storage: &mut dyn Storage, id: &str) -> Result<T, StoreError> {
        let idx = self.position(id)?;
        let mut next = self.items.clone();
        let removed = next.remove(idx);
        self.commit(storage, next)?;
        Ok(removed)
    }

    /// Re-reads from storage, discarding the in-memory copy.
    pub fn reload(&mut self, storage: &dyn Storage) {
        *self = Self::load(storage);
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.items
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            })
    }

    // Writes the whole collection. A revision conflict reloads and fails the
    // mutation; any other failure keeps `next` in memory and marks the store
    // degraded.
    fn commit(&mut self, storage: &mut dyn Storage, next: Vec<T>) -> Result<(), StoreError> {
        let payload = match serde_json::to_string(&next) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "collection serialization failed; keeping in memory");
                self.items = next;
                self.degraded = Some(e.to_string());
                return Ok(());
            }
        };
        match storage.put(&self.key, &payload, self.revision) {
            Ok(revision) => {
                self.items = next;
                self.revision = revision;
                self.degraded = None;
                Ok(())
            }
            Err(StorageError::Conflict {
                key,
                expected,
                found,
            }) => {
                tracing::warn!(key = %key, expected, found, "collection changed underneath; reloading");
                self.reload(storage);
                Err(StoreError::Conflict {
                    key,
                    expected,
                    found,
                })
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "storage write failed; continuing in memory only");
                self.items = next;
                self.degraded = Some(e.to_string());
                Ok(())
            }
        }
    }
}

pub fn apply_patch<T: Entity>(record: &T, patch: &Map<String, Value>) -> Result<T, StoreError> {
    let invalid = |reason: String| StoreError::Invalid {
        kind: T::KIND,
        reason,
    };
    let mut value = serde_json::to_value(record).map_err(|e| invalid(e.to_string()))?;
    let Some(obj) = value.as_object_mut() else {
        return Err(invalid("record is not an object".to_string()));
    };
    for (k, v) in patch {
        if k == "id" {
            continue;
        }
        obj.insert(k.clone(), v.clone());
    }
    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
}

/// Builds a new record from a create payload; any `id` in it is discarded.
pub fn record_from_params<T: Entity>(params: &Map<String, Value>) -> Result<T, StoreError> {
    let mut obj = params.clone();
    obj.insert("id".to_string(), Value::String(String::new()));
    serde_json::from_value(Value::Object(obj)).map_err(|e| StoreError::Invalid {
        kind: T::KIND,
        reason: e.to_string(),
    })
}

pub fn next_id<T: Entity>(items: &[T], scheme: IdScheme, now_ms: i64) -> String {
    match scheme {
        IdScheme::Prefixed { prefix, width } => {
            let max = items
                .iter()
                .filter_map(|r| r.id().strip_prefix(prefix))
                .filter_map(|rest| rest.parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            format!("{}{:0width$}", prefix, max + 1, width = width)
        }
        IdScheme::Sequence => {
            let max = items
                .iter()
                .filter_map(|r| r.id().parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            (max + 1).to_string()
        }
        IdScheme::Timestamp => {
            let mut candidate = now_ms.max(0);
            while items.iter().any(|r| r.id() == candidate.to_string()) {
                candidate += 1;
            }
            candidate.to_string()
        }
        IdScheme::Uuid => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(default)]
        id: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
    }

    impl Entity for Note {
        const KIND: &'static str = "note";
        const STORAGE_KEY: &'static str = "notes";
        const ID_SCHEME: IdScheme = IdScheme::Prefixed {
            prefix: "N",
            width: 3,
        };

        fn id(&self) -> &str {
            &self.id
        }
        fn set_id(&mut self, id: String) {
            self.id = id;
        }
        fn defaults() -> Vec<Self> {
            vec![Note {
                id: "N001".into(),
                text: "seed".into(),
                tag: None,
            }]
        }
    }

    fn note(text: &str) -> Note {
        Note {
            id: String::new(),
            text: text.into(),
            tag: None,
        }
    }

    #[test]
    fn absent_key_seeds_defaults_without_writing() {
        let storage = MemoryStorage::new();
        let c = Collection::<Note>::load(&storage);
        assert_eq!(c.items().len(), 1);
        assert_eq!(c.revision(), 0);
        assert!(storage.get("notes").expect("get").is_none());
    }

    #[test]
    fn corrupt_payload_falls_back_to_defaults_and_next_write_succeeds() {
        let mut storage = MemoryStorage::new();
        storage.put("notes", "{not json", 0).expect("seed garbage");
        let mut c = Collection::<Note>::load(&storage);
        assert_eq!(c.items()[0].text, "seed");
        c.add(&mut storage, note("after"), 0).expect("add");
        assert_eq!(c.revision(), 2);
    }

    #[test]
    fn prefixed_ids_skip_past_deleted_gaps() {
        let mut storage = MemoryStorage::new();
        let mut c = Collection::<Note>::load(&storage);
        let second = c.add(&mut storage, note("b"), 0).expect("add");
        assert_eq!(second.id, "N002");
        c.delete(&mut storage, "N001").expect("delete");
        let third = c.add(&mut storage, note("c"), 0).expect("add");
        assert_eq!(third.id, "N003");
    }

    #[test]
    fn update_merges_fields_and_keeps_id() {
        let mut storage = MemoryStorage::new();
        let mut c = Collection::<Note>::load(&storage);
        let patch = json!({ "id": "HIJACK", "tag": "x" });
        let updated = c
            .update(&mut storage, "N001", patch.as_object().expect("obj"))
            .expect("update");
        assert_eq!(updated.id, "N001");
        assert_eq!(updated.tag.as_deref(), Some("x"));
        assert_eq!(updated.text, "seed");
    }

    #[test]
    fn update_with_wrong_type_is_rejected_and_leaves_collection_alone() {
        let mut storage = MemoryStorage::new();
        let mut c = Collection::<Note>::load(&storage);
        let patch = json!({ "text": 42 });
        let e = c
            .update(&mut storage, "N001", patch.as_object().expect("obj"))
            .unwrap_err();
        assert!(matches!(e, StoreError::Invalid { .. }));
        assert_eq!(c.items()[0].text, "seed");
        assert_eq!(c.revision(), 0);
    }

    #[test]
    fn delete_of_unknown_id_is_not_found_and_writes_nothing() {
        let mut storage = MemoryStorage::new();
        let mut c = Collection::<Note>::load(&storage);
        let e = c.delete(&mut storage, "N999").unwrap_err();
        assert!(matches!(e, StoreError::NotFound { .. }));
        assert_eq!(c.items().len(), 1);
        assert!(storage.get("notes").expect("get").is_none());
    }

    #[test]
    fn quota_failure_degrades_then_recovers() {
        let mut storage = MemoryStorage::with_quota(64);
        let mut c = Collection::<Note>::load(&storage);
        let big = "x".repeat(200);
        c.add(&mut storage, note(&big), 0).expect("add still succeeds");
        assert_eq!(c.items().len(), 2);
        assert!(c.degraded().is_some());

        c.delete(&mut storage, "N002").expect("delete");
        assert!(c.degraded().is_none());
        assert_eq!(c.revision(), 1);
    }

    #[test]
    fn foreign_write_is_reported_as_conflict_and_reloads() {
        let mut storage = MemoryStorage::new();
        let mut c = Collection::<Note>::load(&storage);
        c.add(&mut storage, note("mine"), 0).expect("add");

        let foreign = r#"[{"id":"N050","text":"theirs"}]"#;
        storage.put("notes", foreign, 1).expect("foreign write");

        let e = c.add(&mut storage, note("late"), 0).unwrap_err();
        assert!(matches!(e, StoreError::Conflict { found: 2, .. }));
        assert_eq!(c.items().len(), 1);
        assert_eq!(c.items()[0].id, "N050");
        assert_eq!(c.revision(), 2);
    }

    #[test]
    fn timestamp_ids_never_collide() {
        let items = vec![
            Note {
                id: "1000".into(),
                text: "a".into(),
                tag: None,
            },
            Note {
                id: "1001".into(),
                text: "b".into(),
                tag: None,
            },
        ];
        assert_eq!(next_id(&items, IdScheme::Timestamp, 1000), "1002");
        assert_eq!(next_id(&items, IdScheme::Sequence, 0), "1002");
    }

    #[test]
    fn record_from_params_ignores_supplied_id() {
        let params = json!({ "id": "N777", "text": "hello" });
        let n: Note = record_from_params(params.as_object().expect("obj")).expect("parse");
        assert_eq!(n.id, "");
        assert_eq!(n.text, "hello");
    }
}
