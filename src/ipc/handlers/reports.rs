use crate::filter::derive_view;
use crate::ipc::helpers::{
    create_record, delete_record, expected_revision, get_object, get_required_str, list_query,
    permissions, record_response, require, respond, today, update_record, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::models::{ReportCategory, ReportListing, ReportStatus};
use crate::permissions::PermissionSummary;
use serde_json::{json, Map, Value};

const FACETS: &[&str] = &["status", "type", "category"];

/// Runs `$body` against the collection backing `$category`, bound to `$coll`.
macro_rules! with_book {
    ($state:ident, $category:expr, $coll:ident => $body:expr) => {
        match $category {
            ReportCategory::ReportCard => {
                let $coll = &mut $state.stores.report_cards;
                $body
            }
            ReportCategory::ClassReport => {
                let $coll = &mut $state.stores.class_reports;
                $body
            }
            ReportCategory::DepartmentalReport => {
                let $coll = &mut $state.stores.departmental_reports;
                $body
            }
        }
    };
}

fn category_param(params: &Value) -> Result<ReportCategory, HandlerErr> {
    let raw = get_required_str(params, "category")?;
    ReportCategory::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown report category: {raw}")))
}

fn writable_category(state: &AppState, params: &Value, action: &str) -> Result<ReportCategory, HandlerErr> {
    let perms = permissions(state)?;
    let category = category_param(params)?;
    require(perms.can_manage_reports(category), action)?;
    Ok(category)
}

fn listings(state: &AppState, perms: &PermissionSummary) -> Vec<ReportListing> {
    let mut out = Vec::new();
    for category in perms.report_categories() {
        match category {
            ReportCategory::ReportCard => {
                out.extend(state.stores.report_cards.items().iter().map(ReportListing::from))
            }
            ReportCategory::ClassReport => {
                out.extend(state.stores.class_reports.items().iter().map(ReportListing::from))
            }
            ReportCategory::DepartmentalReport => out.extend(
                state
                    .stores
                    .departmental_reports
                    .items()
                    .iter()
                    .map(ReportListing::from),
            ),
        }
    }
    out
}

/// Every book the caller may see, merged, with totals over all of them.
fn handle_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let perms = permissions(state)?;
    let categories = perms.report_categories();
    let items = listings(state, &perms);
    let view = derive_view(&items, &list_query(params, FACETS));

    let tabs: Vec<Value> = categories
        .iter()
        .map(|c| json!({ "value": c.as_str(), "label": c.label() }))
        .collect();
    let mut revisions = Map::new();
    let mut warnings = Vec::new();
    for (key, revision, degraded) in [
        (
            state.stores.report_cards.key(),
            state.stores.report_cards.revision(),
            state.stores.report_cards.degraded(),
        ),
        (
            state.stores.class_reports.key(),
            state.stores.class_reports.revision(),
            state.stores.class_reports.degraded(),
        ),
        (
            state.stores.departmental_reports.key(),
            state.stores.departmental_reports.revision(),
            state.stores.departmental_reports.degraded(),
        ),
    ] {
        revisions.insert(key.to_string(), json!(revision));
        if let Some(w) = degraded {
            warnings.push(w.to_string());
        }
    }

    let mut out = json!({
        "records": view.records,
        "matched": view.matched,
        "stats": view.stats,
        "categories": tabs,
        "revisions": revisions,
    });
    if !warnings.is_empty() {
        out["warning"] = json!(warnings.join("; "));
    }
    Ok(out)
}

fn handle_create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let category = writable_category(state, params, "add reports here")?;
    let mut fields = get_object(params, "record")?;
    let blank = |v: Option<&Value>| v.and_then(Value::as_str).map_or(true, |s| s.trim().is_empty());
    if blank(fields.get("date")) {
        fields.insert("date".into(), json!(today().format("%Y-%m-%d").to_string()));
    }
    if blank(fields.get("status")) {
        fields.insert("status".into(), json!(ReportStatus::Processing.as_str()));
    }
    let mut out = with_book!(state, category, coll => {
        create_record(coll, state.storage.as_mut(), params, &fields)
    })?;
    out["category"] = json!(category.as_str());
    Ok(out)
}

fn handle_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let category = writable_category(state, params, "edit reports here")?;
    let patch = get_object(params, "patch")?;
    let mut out = with_book!(state, category, coll => {
        update_record(coll, state.storage.as_mut(), params, &patch)
    })?;
    out["category"] = json!(category.as_str());
    Ok(out)
}

fn handle_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let category = writable_category(state, params, "remove reports here")?;
    let mut out = with_book!(state, category, coll => {
        delete_record(coll, state.storage.as_mut(), params)
    })?;
    out["category"] = json!(category.as_str());
    Ok(out)
}

/// Moves a report between `Processing` and `Ready`.
fn handle_set_status(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let category = writable_category(state, params, "update reports here")?;
    let id = get_required_str(params, "id")?;
    let raw = get_required_str(params, "status")?;
    let status = ReportStatus::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown report status: {raw}")))?;
    let expected = expected_revision(params)?;
    let mut out = with_book!(state, category, coll => {
        coll.check_revision(expected)?;
        let report = coll.modify(state.storage.as_mut(), &id, |r| r.status = status)?;
        record_response(coll, &report)
    });
    out["category"] = json!(category.as_str());
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let result = match req.method.as_str() {
        "reports.list" => handle_list(state, p),
        "reports.create" => handle_create(state, p),
        "reports.update" => handle_update(state, p),
        "reports.delete" => handle_delete(state, p),
        "reports.setStatus" => handle_set_status(state, p),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
