use crate::ipc::helpers::{
    create_record, delete_record, export_records, get_object, get_opt_str, get_required_str,
    list_query, list_response, permissions, require, respond, today, update_record, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::store::{apply_patch, record_from_params};
use chrono::Local;
use serde_json::{json, Value};

const FACETS: &[&str] = &["status", "class", "date"];

fn handle_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    Ok(list_response(
        &state.stores.attendance,
        state.stores.attendance.items(),
        &list_query(params, FACETS),
    ))
}

fn existing(state: &AppState, id: &str) -> Result<AttendanceRecord, HandlerErr> {
    state
        .stores
        .attendance
        .get(id)
        .cloned()
        .ok_or_else(|| HandlerErr::new("not_found", format!("attendance not found: {id}")))
}

fn handle_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let mut fields = get_object(params, "record")?;
    if !fields.contains_key("date") {
        fields.insert("date".into(), json!(today().format("%Y-%m-%d").to_string()));
    }
    let candidate: AttendanceRecord = record_from_params(&fields)?;
    require(perms.can_mark_attendance(&candidate.class), "record attendance for this class")?;
    create_record(&mut state.stores.attendance, state.storage.as_mut(), params, &fields)
}

fn handle_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let id = get_required_str(params, "id")?;
    let patch = get_object(params, "patch")?;
    let current = existing(state, &id)?;
    let next = apply_patch(&current, &patch)?;
    require(
        perms.can_mark_attendance(&current.class) && perms.can_mark_attendance(&next.class),
        "edit attendance for this class",
    )?;
    update_record(&mut state.stores.attendance, state.storage.as_mut(), params, &patch)
}

fn handle_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let id = get_required_str(params, "id")?;
    let current = existing(state, &id)?;
    require(perms.can_mark_attendance(&current.class), "remove attendance for this class")?;
    delete_record(&mut state.stores.attendance, state.storage.as_mut(), params)
}

/// Sets the status of every record for `studentId` on `date` (default today).
fn handle_mark(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let student_id = get_required_str(params, "studentId")?;
    let raw = get_required_str(params, "status")?;
    let status = AttendanceStatus::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown attendance status: {raw}")))?;
    let date = get_opt_str(params, "date")
        .map(str::to_string)
        .unwrap_or_else(|| today().format("%Y-%m-%d").to_string());

    let targets: Vec<&AttendanceRecord> = state
        .stores
        .attendance
        .items()
        .iter()
        .filter(|r| r.student_id == student_id && r.date == date)
        .collect();
    if targets.is_empty() {
        return Err(HandlerErr::new(
            "not_found",
            format!("no attendance for {student_id} on {date}"),
        ));
    }
    require(
        targets.iter().all(|r| perms.can_mark_attendance(&r.class)),
        "record attendance for this class",
    )?;

    let now = Local::now().time();
    let marked = state.stores.attendance.modify_where(
        state.storage.as_mut(),
        |r| r.student_id == student_id && r.date == date,
        |r| r.mark(status, now),
    )?;
    let records: Vec<&AttendanceRecord> = state
        .stores
        .attendance
        .items()
        .iter()
        .filter(|r| r.student_id == student_id && r.date == date)
        .collect();
    let mut out = json!({
        "marked": marked,
        "records": records,
        "revision": state.stores.attendance.revision(),
    });
    if let Some(w) = state.stores.attendance.degraded() {
        out["warning"] = json!(w);
    }
    Ok(out)
}

fn handle_export(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    let rows = list_query(params, FACETS).apply(state.stores.attendance.items());
    export_records(&rows, params, state.config.export.out_dir.as_deref())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.list" => handle_list(state, &req.params),
        "attendance.create" => handle_create(state, &req.params),
        "attendance.update" => handle_update(state, &req.params),
        "attendance.delete" => handle_delete(state, &req.params),
        "attendance.mark" => handle_mark(state, &req.params),
        "attendance.export" => handle_export(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
