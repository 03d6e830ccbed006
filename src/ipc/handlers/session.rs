use crate::auth::{self, AuthError};
use crate::ipc::helpers::{
    expected_revision, get_object, get_opt_str, get_required_str, permissions, require, respond,
    session, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::models::user::{load_profile, merge_profile, save_profile};
use crate::models::{AccountStatus, PublicUser, User};
use crate::permissions::{PermissionSummary, Session};
use crate::storage::StorageError;
use serde_json::{json, Value};

fn session_json(s: &Session) -> Value {
    json!({
        "user": s.public_user(),
        "profile": s.profile,
        "profileRevision": s.profile_revision,
        "permissions": s.permissions,
    })
}

fn handle_login(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let password = get_required_str(params, "password")?;
    let user = match auth::authenticate(state.stores.users.items(), &email, &password) {
        Ok(u) => u.clone(),
        Err(e @ AuthError::InvalidCredentials) => {
            tracing::info!(email = %email, "login rejected");
            return Err(HandlerErr::new("invalid_credentials", e.to_string()));
        }
        Err(e @ AuthError::AccountRestricted { status }) => {
            tracing::info!(email = %email, status = status.as_str(), "login for restricted account");
            return Err(HandlerErr::new("account_restricted", e.to_string())
                .with_details(json!({ "accountStatus": status.as_str() })));
        }
    };
    let (profile, revision) = load_profile(state.storage.as_ref(), &user);
    let s = Session::new(user, profile, revision);
    tracing::info!(user = %s.user.id, role = %s.user.role, "signed in");
    let out = session_json(&s);
    state.session = Some(s);
    Ok(out)
}

fn handle_logout(state: &mut AppState) -> Result<Value, HandlerErr> {
    let was = state.session.take().map(|s| s.user.id);
    Ok(json!({ "signedOut": was.is_some() }))
}

fn handle_session_get(state: &mut AppState) -> Result<Value, HandlerErr> {
    Ok(match &state.session {
        Some(s) => session_json(s),
        None => json!({ "user": null }),
    })
}

/// The user whose profile a request targets: the caller, or with `userId`
/// another user, which only administrators may name.
fn profile_target(state: &AppState, params: &Value, action: &str) -> Result<User, HandlerErr> {
    let s = session(state)?;
    match get_opt_str(params, "userId").filter(|id| *id != s.user.id) {
        None => Ok(s.user.clone()),
        Some(id) => {
            require(s.permissions.can_administer(), action)?;
            state
                .stores
                .users
                .get(id)
                .cloned()
                .ok_or_else(|| HandlerErr::new("not_found", format!("user not found: {id}")))
        }
    }
}

fn is_session_user(state: &AppState, user: &User) -> bool {
    state.session.as_ref().is_some_and(|s| s.user.id == user.id)
}

fn handle_profile_get(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let user = profile_target(state, params, "read another user's profile")?;
    if is_session_user(state, &user) {
        let s = session(state)?;
        return Ok(json!({
            "userId": s.user.id,
            "profile": s.profile,
            "revision": s.profile_revision,
            "permissions": s.permissions,
        }));
    }
    let (profile, revision) = load_profile(state.storage.as_ref(), &user);
    Ok(json!({
        "userId": user.id,
        "permissions": PermissionSummary::derive(&user, &profile),
        "profile": profile,
        "revision": revision,
    }))
}

fn handle_profile_update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let patch = get_object(params, "patch")?;
    let expected = expected_revision(params)?;
    let user = profile_target(state, params, "edit another user's profile")?;
    let own = is_session_user(state, &user);
    let (current, revision) = match &state.session {
        Some(s) if own => (s.profile.clone(), s.profile_revision),
        _ => load_profile(state.storage.as_ref(), &user),
    };
    if let Some(exp) = expected {
        if exp != revision {
            return Err(HandlerErr::new("conflict", "profile changed since it was read")
                .with_details(json!({ "expectedRevision": exp, "revision": revision })));
        }
    }
    let next = merge_profile(&current, &patch);
    if current.grants_differ(&next) {
        require(
            permissions(state)?.can_administer(),
            "change class teacher or department head status",
        )?;
    }

    let (revision, warning) = match save_profile(state.storage.as_mut(), &user.id, &next, revision) {
        Ok(r) => (r, None),
        Err(e @ StorageError::Conflict { .. }) => {
            if own {
                let (fresh, fresh_rev) = load_profile(state.storage.as_ref(), &user);
                if let Some(s) = state.session.as_mut() {
                    s.set_profile(fresh, fresh_rev);
                }
            }
            return Err(e.into());
        }
        Err(e) => {
            tracing::warn!(user = %user.id, error = %e, "profile write failed; keeping in memory");
            (revision, Some(e.to_string()))
        }
    };
    if !own {
        tracing::info!(user = %user.id, "profile edited by administrator");
    }

    let derived = PermissionSummary::derive(&user, &next);
    if own {
        if let Some(s) = state.session.as_mut() {
            s.set_profile(next.clone(), revision);
        }
    }
    let mut out = json!({
        "userId": user.id,
        "profile": next,
        "revision": revision,
        "permissions": derived,
    });
    if let Some(w) = warning {
        out["warning"] = json!(w);
    }
    Ok(out)
}

fn handle_users_list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "list users")?;
    let role = get_opt_str(params, "role").filter(|r| *r != "all");
    let users: Vec<PublicUser> = state
        .stores
        .users
        .items()
        .iter()
        .filter(|u| role.map_or(true, |r| u.role.as_str() == r))
        .map(PublicUser::from)
        .collect();
    Ok(json!({
        "users": users,
        "revision": state.stores.users.revision(),
    }))
}

fn handle_users_set_status(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    require(permissions(state)?.can_administer(), "change account status")?;
    let id = get_required_str(params, "id")?;
    let raw = get_required_str(params, "status")?;
    let status = AccountStatus::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown account status: {raw}")))?;
    state.stores.users.check_revision(expected_revision(params)?)?;
    let user = state
        .stores
        .users
        .modify(state.storage.as_mut(), &id, |u| u.account_status = status)?;
    let mut out = json!({
        "user": PublicUser::from(&user),
        "revision": state.stores.users.revision(),
    });
    if let Some(w) = state.stores.users.degraded() {
        out["warning"] = json!(w);
    }
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "session.login" => handle_login(state, &req.params),
        "session.logout" => handle_logout(state),
        "session.get" => handle_session_get(state),
        "profile.get" => handle_profile_get(state, &req.params),
        "profile.update" => handle_profile_update(state, &req.params),
        "users.list" => handle_users_list(state, &req.params),
        "users.setStatus" => handle_users_set_status(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
