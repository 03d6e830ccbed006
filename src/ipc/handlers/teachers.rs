use crate::ipc::helpers::{
    create_record, delete_record, expected_revision, export_records, get_object, get_required_str,
    list_query, list_response, permissions, record_response, require, respond, today, update_record,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::models::teacher::normalize_class_input;
use crate::models::TeacherStatus;
use serde_json::{json, Value};

const FACETS: &[&str] = &["status", "department"];

fn handle_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    Ok(list_response(
        &state.stores.teachers,
        state.stores.teachers.items(),
        &list_query(params, FACETS),
    ))
}

fn handle_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "add teachers")?;
    let mut fields = get_object(params, "record")?;
    normalize_class_input(&mut fields);
    let blank = fields
        .get("joinDate")
        .and_then(Value::as_str)
        .map_or(true, |d| d.trim().is_empty());
    if blank {
        fields.insert("joinDate".into(), json!(today().format("%Y-%m-%d").to_string()));
    }
    create_record(&mut state.stores.teachers, state.storage.as_mut(), params, &fields)
}

fn handle_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "edit teachers")?;
    let mut patch = get_object(params, "patch")?;
    normalize_class_input(&mut patch);
    update_record(&mut state.stores.teachers, state.storage.as_mut(), params, &patch)
}

fn handle_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "remove teachers")?;
    delete_record(&mut state.stores.teachers, state.storage.as_mut(), params)
}

fn handle_archive(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "archive teachers")?;
    let id = get_required_str(params, "id")?;
    state.stores.teachers.check_revision(expected_revision(params)?)?;
    let teacher = state
        .stores
        .teachers
        .modify(state.storage.as_mut(), &id, |t| t.status = TeacherStatus::Inactive)?;
    Ok(record_response(&state.stores.teachers, &teacher))
}

fn handle_export(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    let rows = list_query(params, FACETS).apply(state.stores.teachers.items());
    export_records(&rows, params, state.config.export.out_dir.as_deref())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "teachers.list" => handle_list(state, &req.params),
        "teachers.create" => handle_create(state, &req.params),
        "teachers.update" => handle_update(state, &req.params),
        "teachers.delete" => handle_delete(state, &req.params),
        "teachers.archive" => handle_archive(state, &req.params),
        "teachers.export" => handle_export(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
