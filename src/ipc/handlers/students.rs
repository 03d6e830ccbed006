use crate::ipc::helpers::{
    create_record, delete_record, expected_revision, export_records, get_object, get_opt_str,
    get_required_str, list_query, list_response, now_ms, permissions, record_response, require,
    respond, session, update_record, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::models::communication::message_timestamp;
use crate::models::{
    AccountStatus, Notification, OperationType, PendingStudentOperation, ReviewStatus, Student,
};
use crate::permissions::{PermissionSummary, StudentWrite};
use crate::store::{apply_patch, record_from_params};
use serde_json::{json, Map, Value};

const FACETS: &[&str] = &["fees", "class", "status"];

fn visible_students(state: &AppState, perms: &PermissionSummary) -> Vec<Student> {
    state
        .stores
        .students
        .items()
        .iter()
        .filter(|s| perms.class_scope.admits(&s.class))
        .cloned()
        .collect()
}

fn handle_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let items = visible_students(state, &perms);
    let mut out = list_response(&state.stores.students, &items, &list_query(params, FACETS));
    out["pageDescription"] = json!(perms.page_description);
    Ok(out)
}

fn handle_export(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let items = visible_students(state, &perms);
    let filtered = list_query(params, FACETS).apply(&items);
    export_records(&filtered, params, state.config.export.out_dir.as_deref())
}

/// Records a class teacher's change for review and raises an admin notification.
fn queue_operation(
    state: &mut AppState,
    op_type: OperationType,
    student_data: Map<String, Value>,
    original: Option<Student>,
) -> Result<Value, HandlerErr> {
    let s = session(state)?;
    let op = PendingStudentOperation {
        id: String::new(),
        op_type,
        student_data,
        original_student: original,
        teacher_name: s.user.name.clone(),
        teacher_id: s.user.id.clone(),
        timestamp: message_timestamp(),
        status: ReviewStatus::Pending,
        reason: None,
    };
    let op = state.stores.pending.add(state.storage.as_mut(), op, now_ms())?;
    state
        .stores
        .notifications
        .add(state.storage.as_mut(), Notification::for_operation(&op), now_ms())?;
    tracing::info!(operation = %op.id, kind = op.op_type.as_str(), "student change queued for approval");

    let mut out = json!({
        "queued": true,
        "operation": op,
        "revision": state.stores.pending.revision(),
    });
    if let Some(w) = state.stores.pending.degraded() {
        out["warning"] = json!(w);
    }
    Ok(out)
}

fn existing(state: &AppState, id: &str) -> Result<Student, HandlerErr> {
    state
        .stores
        .students
        .get(id)
        .cloned()
        .ok_or_else(|| HandlerErr::new("not_found", format!("student not found: {id}")))
}

fn write_access(perms: &PermissionSummary, classes: &[&str]) -> Result<StudentWrite, HandlerErr> {
    let mut access = perms.student_write;
    for class in classes {
        if perms.student_write_for(class) == StudentWrite::Denied {
            access = StudentWrite::Denied;
        }
    }
    match access {
        StudentWrite::Denied => Err(HandlerErr::forbidden("manage these students")),
        other => Ok(other),
    }
}

fn handle_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let fields = get_object(params, "record")?;
    // Validate the shape before anything is queued or written.
    let candidate: Student = record_from_params(&fields)?;
    match write_access(&perms, &[candidate.class.as_str()])? {
        StudentWrite::Queued => queue_operation(state, OperationType::Add, fields, None),
        _ => create_record(&mut state.stores.students, state.storage.as_mut(), params, &fields),
    }
}

fn edit(state: &mut AppState, params: &Value, patch: Map<String, Value>) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let id = get_required_str(params, "id")?;
    let current = existing(state, &id)?;
    let next = apply_patch(&current, &patch)?;
    match write_access(&perms, &[current.class.as_str(), next.class.as_str()])? {
        StudentWrite::Queued => {
            let mut data = patch;
            data.insert("id".into(), json!(id));
            queue_operation(state, OperationType::Edit, data, Some(current))
        }
        _ => update_record(&mut state.stores.students, state.storage.as_mut(), params, &patch),
    }
}

fn handle_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let patch = get_object(params, "patch")?;
    edit(state, params, patch)
}

fn handle_set_status(state: &mut AppState, params: &Value, status: Option<AccountStatus>) -> Result<Value, HandlerErr> {
    let status = match status {
        Some(s) => s,
        None => {
            let raw = get_required_str(params, "status")?;
            AccountStatus::parse(&raw)
                .ok_or_else(|| HandlerErr::bad_params(format!("unknown student status: {raw}")))?
        }
    };
    let mut patch = Map::new();
    patch.insert("status".into(), json!(status.as_str()));
    edit(state, params, patch)
}

fn handle_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let id = get_required_str(params, "id")?;
    let current = existing(state, &id)?;
    match write_access(&perms, &[current.class.as_str()])? {
        StudentWrite::Queued => {
            let mut data = Map::new();
            data.insert("id".into(), json!(id));
            queue_operation(state, OperationType::Delete, data, Some(current))
        }
        _ => delete_record(&mut state.stores.students, state.storage.as_mut(), params),
    }
}

fn handle_pending_submit(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    require(perms.is_class_teacher, "submit student changes for approval")?;
    let raw = get_required_str(params, "type")?;
    let op_type = OperationType::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown operation type: {raw}")))?;
    let data = get_object(params, "studentData")?;
    let original = match op_type {
        OperationType::Add => {
            let candidate: Student = record_from_params(&data)?;
            write_access(&perms, &[candidate.class.as_str()])?;
            None
        }
        OperationType::Edit => {
            let current = existing(state, submitted_id(&data)?)?;
            let next = apply_patch(&current, &data)?;
            write_access(&perms, &[current.class.as_str(), next.class.as_str()])?;
            Some(current)
        }
        OperationType::Delete => {
            let current = existing(state, submitted_id(&data)?)?;
            write_access(&perms, &[current.class.as_str()])?;
            Some(current)
        }
    };
    queue_operation(state, op_type, data, original)
}

fn submitted_id(data: &Map<String, Value>) -> Result<&str, HandlerErr> {
    data.get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerErr::bad_params("studentData.id is required"))
}

fn handle_pending_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    require(perms.is_admin || perms.is_class_teacher, "view pending student changes")?;
    let own_id = session(state)?.user.id.clone();
    let items: Vec<PendingStudentOperation> = state
        .stores
        .pending
        .items()
        .iter()
        .filter(|op| perms.is_admin || op.teacher_id == own_id)
        .cloned()
        .collect();
    Ok(list_response(
        &state.stores.pending,
        &items,
        &list_query(params, &["status", "type"]),
    ))
}

fn pending_op(state: &AppState, id: &str) -> Result<PendingStudentOperation, HandlerErr> {
    let op = state
        .stores
        .pending
        .get(id)
        .cloned()
        .ok_or_else(|| HandlerErr::new("not_found", format!("pending operation not found: {id}")))?;
    if op.status != ReviewStatus::Pending {
        return Err(HandlerErr::new(
            "bad_state",
            format!("operation {id} is already {}", op.status.as_str()),
        )
        .with_details(json!({ "status": op.status.as_str() })));
    }
    Ok(op)
}

fn review_operation(
    state: &mut AppState,
    op_id: &str,
    status: ReviewStatus,
    reason: Option<String>,
) -> Result<PendingStudentOperation, HandlerErr> {
    let closed = state.stores.pending.modify(state.storage.as_mut(), op_id, |op| {
        op.status = status;
        op.reason = reason;
    })?;
    let flagged = state.stores.notifications.modify_where(
        state.storage.as_mut(),
        |n| n.operation_id.as_deref() == Some(op_id),
        |n| {
            n.status = status;
            n.read = status != ReviewStatus::Pending;
        },
    );
    if let Err(e) = flagged {
        tracing::warn!(operation = %op_id, error = %e, "notification not updated");
    }
    Ok(closed)
}

/// A pending operation checked against the current student store and ready
/// to write.
enum StudentChange {
    Add(Student),
    Edit(String, Map<String, Value>),
    Delete(String),
}

fn prepare_change(state: &AppState, op: &PendingStudentOperation) -> Result<StudentChange, HandlerErr> {
    let target = || {
        op.target_id()
            .map(str::to_string)
            .ok_or_else(|| HandlerErr::bad_params("operation has no target student"))
    };
    Ok(match op.op_type {
        OperationType::Add => StudentChange::Add(record_from_params(&op.student_data)?),
        OperationType::Edit => {
            let id = target()?;
            apply_patch(&existing(state, &id)?, &op.student_data)?;
            StudentChange::Edit(id, op.student_data.clone())
        }
        OperationType::Delete => {
            let id = target()?;
            existing(state, &id)?;
            StudentChange::Delete(id)
        }
    })
}

fn apply_change(state: &mut AppState, change: StudentChange) -> Result<Value, HandlerErr> {
    let storage = state.storage.as_mut();
    let students = &mut state.stores.students;
    Ok(match change {
        StudentChange::Add(record) => json!(students.add(storage, record, now_ms())?),
        StudentChange::Edit(id, patch) => json!(students.update(storage, &id, &patch)?),
        StudentChange::Delete(id) => json!(students.delete(storage, &id)?),
    })
}

// The operation is closed before the student store is touched, so a retry
// after a failure can never apply the same change twice.
fn handle_pending_approve(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "approve student changes")?;
    let id = get_required_str(params, "id")?;
    let op = pending_op(state, &id)?;
    let change = prepare_change(state, &op)?;

    let closed = review_operation(state, &id, ReviewStatus::Approved, None)?;
    let applied = match apply_change(state, change) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(operation = %id, code = e.code, "approved change failed to apply; reopening");
            if let Err(reopen) = review_operation(state, &id, ReviewStatus::Pending, None) {
                tracing::warn!(operation = %id, error = %reopen.message, "operation left approved");
            }
            return Err(e);
        }
    };
    tracing::info!(operation = %id, "pending student change approved");

    let mut out = record_response(&state.stores.pending, &closed);
    out["student"] = applied;
    out["studentsRevision"] = json!(state.stores.students.revision());
    Ok(out)
}

fn handle_pending_reject(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "reject student changes")?;
    let id = get_required_str(params, "id")?;
    pending_op(state, &id)?;
    let reason = get_opt_str(params, "reason").map(|s| s.to_string());
    let closed = review_operation(state, &id, ReviewStatus::Rejected, reason)?;
    Ok(record_response(&state.stores.pending, &closed))
}

fn handle_pending_check_revision(state: &AppState, params: &Value) -> Result<(), HandlerErr> {
    state.stores.pending.check_revision(expected_revision(params)?)?;
    Ok(())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let result = match req.method.as_str() {
        "students.list" => handle_list(state, p),
        "students.create" => handle_create(state, p),
        "students.update" => handle_update(state, p),
        "students.delete" => handle_delete(state, p),
        "students.setStatus" => handle_set_status(state, p, None),
        "students.archive" => handle_set_status(state, p, Some(AccountStatus::Archived)),
        "students.suspend" => handle_set_status(state, p, Some(AccountStatus::Suspended)),
        "students.expel" => handle_set_status(state, p, Some(AccountStatus::Expelled)),
        "students.reactivate" => handle_set_status(state, p, Some(AccountStatus::Active)),
        "students.export" => handle_export(state, p),
        "students.pending.submit" => handle_pending_submit(state, p),
        "students.pending.list" => handle_pending_list(state, p),
        "students.pending.approve" => {
            handle_pending_check_revision(state, p).and_then(|_| handle_pending_approve(state, p))
        }
        "students.pending.reject" => {
            handle_pending_check_revision(state, p).and_then(|_| handle_pending_reject(state, p))
        }
        _ => return None,
    };
    Some(respond(&req.id, result))
}
