use crate::ipc::helpers::{
    create_record, delete_record, export_records, get_object, list_query, list_response,
    permissions, require, respond, update_record, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::Value;

const FACETS: &[&str] = &["status", "type"];

fn handle_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    Ok(list_response(
        &state.stores.facilities,
        state.stores.facilities.items(),
        &list_query(params, FACETS),
    ))
}

fn handle_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "add facilities")?;
    let fields = get_object(params, "record")?;
    create_record(&mut state.stores.facilities, state.storage.as_mut(), params, &fields)
}

fn handle_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "edit facilities")?;
    let patch = get_object(params, "patch")?;
    update_record(&mut state.stores.facilities, state.storage.as_mut(), params, &patch)
}

fn handle_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "remove facilities")?;
    delete_record(&mut state.stores.facilities, state.storage.as_mut(), params)
}

fn handle_export(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    let rows = list_query(params, FACETS).apply(state.stores.facilities.items());
    export_records(&rows, params, state.config.export.out_dir.as_deref())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "facilities.list" => handle_list(state, &req.params),
        "facilities.create" => handle_create(state, &req.params),
        "facilities.update" => handle_update(state, &req.params),
        "facilities.delete" => handle_delete(state, &req.params),
        "facilities.export" => handle_export(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
