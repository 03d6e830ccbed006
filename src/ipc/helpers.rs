use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::backup::BackupError;
use crate::export::{self, CsvRecord, ExportError, ExportFormat};
use crate::filter::{derive_view, CategoryFilter, ListQuery, Searchable, Summarize};
use crate::ipc::error::{err, ok};
use crate::ipc::types::AppState;
use crate::permissions::{PermissionSummary, Session};
use crate::storage::{Storage, StorageError};
use crate::store::{record_from_params, Collection, Entity, StoreError};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn forbidden(action: &str) -> Self {
        Self::new("forbidden", format!("not allowed to {action}"))
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::NotFound { .. } => Self::new("not_found", e.to_string()),
            StoreError::Invalid { .. } => Self::bad_params(e.to_string()),
            StoreError::Conflict {
                key,
                expected,
                found,
            } => Self::new("conflict", e.to_string()).with_details(json!({
                "key": key,
                "expectedRevision": expected,
                "revision": found,
            })),
        }
    }
}

impl From<ExportError> for HandlerErr {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::Empty(_) => Self::new("export_empty", e.to_string()),
            other => Self::new("export_failed", other.to_string()),
        }
    }
}

impl From<BackupError> for HandlerErr {
    fn from(e: BackupError) -> Self {
        Self::new("backup_failed", e.to_string())
    }
}

impl From<StorageError> for HandlerErr {
    fn from(e: StorageError) -> Self {
        match &e {
            StorageError::Conflict { key, expected, found } => Self::new("conflict", e.to_string())
                .with_details(json!({
                    "key": key,
                    "expectedRevision": expected,
                    "revision": found,
                })),
            _ => Self::new("storage_failed", e.to_string()),
        }
    }
}

pub fn respond(id: &str, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn get_object(params: &Value, key: &str) -> Result<Map<String, Value>, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_object())
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params(format!("missing object {}", key)))
}

pub fn expected_revision(params: &Value) -> Result<Option<u64>, HandlerErr> {
    match params.get("expectedRevision") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params("expectedRevision must be a non-negative integer")),
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn session(state: &AppState) -> Result<&Session, HandlerErr> {
    state
        .session
        .as_ref()
        .ok_or_else(|| HandlerErr::new("unauthenticated", "sign in first"))
}

pub fn permissions(state: &AppState) -> Result<PermissionSummary, HandlerErr> {
    session(state).map(|s| s.permissions.clone())
}

pub fn require(allowed: bool, action: &str) -> Result<(), HandlerErr> {
    if allowed {
        Ok(())
    } else {
        Err(HandlerErr::forbidden(action))
    }
}

/// `search` plus one categorical filter per name in `facets`, read from
/// params of the same name.
pub fn list_query(params: &Value, facets: &[&'static str]) -> ListQuery {
    facets.iter().fold(
        ListQuery::new().search(get_opt_str(params, "search")),
        |q, name| q.facet(name, CategoryFilter::parse(get_opt_str(params, name))),
    )
}

fn attach_warning<T: Entity>(v: &mut Value, coll: &Collection<T>) {
    if let Some(w) = coll.degraded() {
        v["warning"] = json!(w);
    }
}

pub fn list_response<T>(coll: &Collection<T>, items: &[T], query: &ListQuery) -> Value
where
    T: Entity + Searchable + Summarize,
{
    let view = derive_view(items, query);
    let mut v = json!({
        "records": view.records,
        "matched": view.matched,
        "stats": view.stats,
        "revision": coll.revision(),
    });
    attach_warning(&mut v, coll);
    v
}

pub fn record_response<T: Entity>(coll: &Collection<T>, record: &T) -> Value {
    let mut v = json!({
        "record": record,
        "revision": coll.revision(),
    });
    attach_warning(&mut v, coll);
    v
}

pub fn create_record<T: Entity>(
    coll: &mut Collection<T>,
    storage: &mut dyn Storage,
    params: &Value,
    fields: &Map<String, Value>,
) -> Result<Value, HandlerErr> {
    coll.check_revision(expected_revision(params)?)?;
    let record: T = record_from_params(fields)?;
    let added = coll.add(storage, record, now_ms())?;
    Ok(record_response(coll, &added))
}

pub fn update_record<T: Entity>(
    coll: &mut Collection<T>,
    storage: &mut dyn Storage,
    params: &Value,
    patch: &Map<String, Value>,
) -> Result<Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    coll.check_revision(expected_revision(params)?)?;
    let updated = coll.update(storage, &id, patch)?;
    Ok(record_response(coll, &updated))
}

pub fn delete_record<T: Entity>(
    coll: &mut Collection<T>,
    storage: &mut dyn Storage,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    coll.check_revision(expected_revision(params)?)?;
    let removed = coll.delete(storage, &id)?;
    let mut v = json!({
        "deleted": removed.id(),
        "revision": coll.revision(),
    });
    attach_warning(&mut v, coll);
    Ok(v)
}

/// Renders `records` and sends them to `outPath`, `outDir`, the configured
/// export directory, or back inline, in that order of preference.
pub fn export_records<T>(
    records: &[T],
    params: &Value,
    config_out_dir: Option<&Path>,
) -> Result<Value, HandlerErr>
where
    T: Entity + CsvRecord + Serialize,
{
    let format = ExportFormat::parse(get_opt_str(params, "format"))
        .ok_or_else(|| HandlerErr::bad_params("format must be csv or json"))?;
    let payload = export::render(records, format, today())?;

    let dest: Option<PathBuf> = match (get_opt_str(params, "outPath"), get_opt_str(params, "outDir")) {
        (Some(p), _) => Some(PathBuf::from(p)),
        (None, Some(d)) => Some(Path::new(d).join(&payload.filename)),
        (None, None) => config_out_dir.map(|d| d.join(&payload.filename)),
    };

    match dest {
        Some(path) => {
            let written = export::write_payload(&payload, &path)?;
            Ok(json!({
                "path": written.to_string_lossy(),
                "filename": payload.filename,
                "format": format.extension(),
                "rows": payload.rows,
            }))
        }
        None => Ok(json!({
            "filename": payload.filename,
            "format": format.extension(),
            "rows": payload.rows,
            "content": payload.content,
        })),
    }
}
