use crate::ipc::helpers::{
    create_record, delete_record, expected_revision, export_records, get_object, get_required_str,
    list_query, list_response, permissions, record_response, require, respond, today, update_record,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::models::AssignmentStatus;
use serde_json::Value;

const FACETS: &[&str] = &["status", "subject", "priority"];

fn handle_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    Ok(list_response(
        &state.stores.assignments,
        state.stores.assignments.items(),
        &list_query(params, FACETS),
    ))
}

fn handle_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_edit_assignments(), "create assignments")?;
    let fields = get_object(params, "record")?;
    create_record(&mut state.stores.assignments, state.storage.as_mut(), params, &fields)
}

fn handle_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_edit_assignments(), "edit assignments")?;
    let patch = get_object(params, "patch")?;
    update_record(&mut state.stores.assignments, state.storage.as_mut(), params, &patch)
}

fn handle_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_edit_assignments(), "remove assignments")?;
    delete_record(&mut state.stores.assignments, state.storage.as_mut(), params)
}

fn handle_set_status(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(
        permissions(state)?.can_set_assignment_status(),
        "change assignment status",
    )?;
    let id = get_required_str(params, "id")?;
    let raw = get_required_str(params, "status")?;
    let status = AssignmentStatus::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown assignment status: {raw}")))?;
    state.stores.assignments.check_revision(expected_revision(params)?)?;
    let day = today();
    let assignment = state
        .stores
        .assignments
        .modify(state.storage.as_mut(), &id, |a| a.set_status(status, day))?;
    Ok(record_response(&state.stores.assignments, &assignment))
}

fn handle_export(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    let rows = list_query(params, FACETS).apply(state.stores.assignments.items());
    export_records(&rows, params, state.config.export.out_dir.as_deref())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "assignments.list" => handle_list(state, &req.params),
        "assignments.create" => handle_create(state, &req.params),
        "assignments.update" => handle_update(state, &req.params),
        "assignments.delete" => handle_delete(state, &req.params),
        "assignments.setStatus" => handle_set_status(state, &req.params),
        "assignments.export" => handle_export(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
