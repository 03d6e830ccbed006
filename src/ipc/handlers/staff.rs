use crate::ipc::helpers::{
    create_record, delete_record, expected_revision, export_records, get_object, get_required_str,
    list_query, list_response, permissions, record_response, require, respond, today, update_record,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::models::teacher::normalize_class_input;
use crate::models::StaffStatus;
use serde_json::{json, Value};

const FACETS: &[&str] = &["status", "type", "department"];

fn handle_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    Ok(list_response(
        &state.stores.staff,
        state.stores.staff.items(),
        &list_query(params, FACETS),
    ))
}

fn handle_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "add staff")?;
    let mut fields = get_object(params, "record")?;
    normalize_class_input(&mut fields);
    if !fields.contains_key("joinDate") {
        fields.insert("joinDate".into(), json!(today().format("%Y-%m-%d").to_string()));
    }
    create_record(&mut state.stores.staff, state.storage.as_mut(), params, &fields)
}

fn handle_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "edit staff")?;
    let mut patch = get_object(params, "patch")?;
    normalize_class_input(&mut patch);
    update_record(&mut state.stores.staff, state.storage.as_mut(), params, &patch)
}

fn handle_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "remove staff")?;
    delete_record(&mut state.stores.staff, state.storage.as_mut(), params)
}

/// `staff.setStatus` reads `status`; the named aliases fix it.
fn handle_set_status(
    state: &mut AppState,
    params: &Value,
    fixed: Option<StaffStatus>,
) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "change staff status")?;
    let status = match fixed {
        Some(s) => s,
        None => {
            let raw = get_required_str(params, "status")?;
            StaffStatus::parse(&raw)
                .ok_or_else(|| HandlerErr::bad_params(format!("unknown staff status: {raw}")))?
        }
    };
    let id = get_required_str(params, "id")?;
    state.stores.staff.check_revision(expected_revision(params)?)?;
    let member = state
        .stores
        .staff
        .modify(state.storage.as_mut(), &id, |m| m.status = status)?;
    tracing::info!(staff = %id, status = status.as_str(), "staff status changed");
    Ok(record_response(&state.stores.staff, &member))
}

fn handle_export(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    let rows = list_query(params, FACETS).apply(state.stores.staff.items());
    export_records(&rows, params, state.config.export.out_dir.as_deref())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let result = match req.method.as_str() {
        "staff.list" => handle_list(state, p),
        "staff.create" => handle_create(state, p),
        "staff.update" => handle_update(state, p),
        "staff.delete" => handle_delete(state, p),
        "staff.setStatus" => handle_set_status(state, p, None),
        "staff.archive" => handle_set_status(state, p, Some(StaffStatus::Archived)),
        "staff.suspend" => handle_set_status(state, p, Some(StaffStatus::Suspended)),
        "staff.terminate" => handle_set_status(state, p, Some(StaffStatus::Terminated)),
        "staff.reactivate" => handle_set_status(state, p, Some(StaffStatus::Active)),
        "staff.export" => handle_export(state, p),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
