use crate::backup;
use crate::ipc::helpers::{get_required_str, permissions, require, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::storage::SqliteStorage;
use serde_json::{json, Value};
use std::path::PathBuf;

fn handle_health(state: &mut AppState) -> Result<Value, HandlerErr> {
    let collections = state.stores.health();
    let degraded: Vec<&str> = collections
        .iter()
        .filter(|c| c.degraded.is_some())
        .map(|c| c.key.as_str())
        .collect();
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
        "storage": state.storage.kind(),
        "collections": collections,
        "degraded": degraded,
        "user": state.session.as_ref().map(|s| s.public_user()),
    }))
}

/// Open before sign-in, or by an administrator; switching ends the session.
fn handle_workspace_select(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    if let Some(s) = &state.session {
        require(s.permissions.can_administer(), "switch workspaces")?;
    }
    let path = PathBuf::from(get_required_str(params, "path")?);
    let storage = SqliteStorage::open(&path)
        .map_err(|e| HandlerErr::new("db_open_failed", format!("{e:#}")))?;
    tracing::info!(workspace = %path.display(), "workspace selected");
    state.replace_storage(Some(path.clone()), Box::new(storage));
    Ok(json!({ "workspacePath": path.to_string_lossy() }))
}

fn handle_workspace_backup(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "back up the workspace")?;
    let out = PathBuf::from(get_required_str(params, "outPath")?);
    let summary = backup::write_snapshot(state.storage.as_ref(), &out)?;
    Ok(json!({
        "path": out.to_string_lossy(),
        "format": summary.format,
        "entryCount": summary.entry_count,
    }))
}

fn handle_workspace_restore(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "restore the workspace")?;
    let bundle = PathBuf::from(get_required_str(params, "bundlePath")?);
    let summary = backup::restore_snapshot(&bundle, state.storage.as_mut())?;
    state.reload();
    Ok(json!({
        "format": summary.format,
        "restoredKeys": summary.restored_keys,
        "user": state.session.as_ref().map(|s| s.public_user()),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state),
        "workspace.select" => handle_workspace_select(state, &req.params),
        "workspace.backup" => handle_workspace_backup(state, &req.params),
        "workspace.restore" => handle_workspace_restore(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
