use crate::ipc::helpers::{
    create_record, delete_record, expected_revision, get_object, get_opt_str, list_query,
    list_response, permissions, require, respond, session, update_record, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::models::communication::message_timestamp;
use serde_json::{json, Value};

const MESSAGE_FACETS: &[&str] = &["type", "status", "priority"];
const CONTACT_FACETS: &[&str] = &["status", "role"];

fn handle_messages_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    Ok(list_response(
        &state.stores.messages,
        state.stores.messages.items(),
        &list_query(params, MESSAGE_FACETS),
    ))
}

fn handle_messages_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_communicate(), "send messages")?;
    let sender = session(state)?.user.name.clone();
    let mut fields = get_object(params, "record")?;
    fields.insert("date".into(), json!(message_timestamp()));
    let blank_sender = fields
        .get("sender")
        .and_then(Value::as_str)
        .map_or(true, |s| s.trim().is_empty());
    if blank_sender {
        fields.insert("sender".into(), json!(sender));
    }
    create_record(&mut state.stores.messages, state.storage.as_mut(), params, &fields)
}

fn handle_messages_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_communicate(), "edit messages")?;
    let patch = get_object(params, "patch")?;
    update_record(&mut state.stores.messages, state.storage.as_mut(), params, &patch)
}

fn handle_messages_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_communicate(), "remove messages")?;
    delete_record(&mut state.stores.messages, state.storage.as_mut(), params)
}

fn handle_contacts_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    permissions(state)?;
    Ok(list_response(
        &state.stores.contacts,
        state.stores.contacts.items(),
        &list_query(params, CONTACT_FACETS),
    ))
}

fn handle_contacts_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_communicate(), "add contacts")?;
    let fields = get_object(params, "record")?;
    create_record(&mut state.stores.contacts, state.storage.as_mut(), params, &fields)
}

fn handle_contacts_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_communicate(), "edit contacts")?;
    let patch = get_object(params, "patch")?;
    update_record(&mut state.stores.contacts, state.storage.as_mut(), params, &patch)
}

fn handle_contacts_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_communicate(), "remove contacts")?;
    delete_record(&mut state.stores.contacts, state.storage.as_mut(), params)
}

fn handle_notifications_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "view notifications")?;
    Ok(list_response(
        &state.stores.notifications,
        state.stores.notifications.items(),
        &list_query(params, &["status", "read"]),
    ))
}

/// Marks one notification read, or all of them when `id` is absent.
fn handle_notifications_mark_read(
    state: &mut AppState,
    params: &Value,
) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "update notifications")?;
    state
        .stores
        .notifications
        .check_revision(expected_revision(params)?)?;
    let id = get_opt_str(params, "id").map(str::to_string);
    if let Some(id) = id.as_deref() {
        if state.stores.notifications.get(id).is_none() {
            return Err(HandlerErr::new(
                "not_found",
                format!("notification not found: {id}"),
            ));
        }
    }
    let updated = state.stores.notifications.modify_where(
        state.storage.as_mut(),
        |n| !n.read && id.as_deref().map_or(true, |want| n.id == want),
        |n| n.read = true,
    )?;
    let mut out = json!({
        "updated": updated,
        "revision": state.stores.notifications.revision(),
    });
    if let Some(w) = state.stores.notifications.degraded() {
        out["warning"] = json!(w);
    }
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let result = match req.method.as_str() {
        "messages.list" => handle_messages_list(state, p),
        "messages.create" => handle_messages_create(state, p),
        "messages.update" => handle_messages_update(state, p),
        "messages.delete" => handle_messages_delete(state, p),
        "contacts.list" => handle_contacts_list(state, p),
        "contacts.create" => handle_contacts_create(state, p),
        "contacts.update" => handle_contacts_update(state, p),
        "contacts.delete" => handle_contacts_delete(state, p),
        "notifications.list" => handle_notifications_list(state, p),
        "notifications.markRead" => handle_notifications_mark_read(state, p),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
