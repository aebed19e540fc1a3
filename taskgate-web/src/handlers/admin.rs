//! Role management pages, behind the Administrator role gate
//!
//! Write failures the storage boundary reports (duplicate users, duplicate
//! grants, unknown users) come back to the admin as error flash messages.

use crate::auth::CurrentUser;
use crate::flash::{Flash, IncomingFlash};
use crate::templates::{render, RolesTemplate, UserRow};
use crate::{AppState, WebResult};
use axum::{
    extract::{Path, State},
    response::Response,
    Form,
};
use serde::Deserialize;
use taskgate_rbac::{provision, PermissionKind, RbacError, RbacResult, User, UserId};
use tracing::info;

pub const ROLES_ROUTE: &str = "/admin/roles";

fn back_to_roles(flash: Flash) -> Response {
    flash.redirect(ROLES_ROUTE)
}

/// Errors an admin can fix from the form become flash messages
fn rejected(result: RbacResult<Response>) -> WebResult<Response> {
    match result {
        Ok(response) => Ok(response),
        Err(
            e @ (RbacError::DuplicateUser(_)
            | RbacError::DuplicateRole(_)
            | RbacError::DuplicatePermission { .. }
            | RbacError::UserNotFound(_)
            | RbacError::InvalidUserId(_)
            | RbacError::UnknownPermission(_)
            | RbacError::UnknownRoleTemplate(_)),
        ) => Ok(back_to_roles(Flash::error(format!("{}.", e)))),
        Err(e) => Err(e.into()),
    }
}

pub async fn roles_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: IncomingFlash,
) -> WebResult<Response> {
    let (flash, jar) = flash.take();
    let page = state.page_context(&user).await?;

    let mut users = Vec::new();
    for account in state.store().list_users().await? {
        let role = state.resolver.role_of(&account.id).await?;
        let held = state.resolver.permissions_of(&account.id).await?;
        let (granted, missing): (Vec<PermissionKind>, Vec<PermissionKind>) = PermissionKind::ALL
            .into_iter()
            .partition(|kind| held.contains(kind));

        users.push(UserRow {
            id: account.id.to_string(),
            label: account.label().to_string(),
            role: role.map(|role| role.name),
            granted: granted.iter().map(|kind| kind.to_string()).collect(),
            missing: missing.iter().map(|kind| kind.to_string()).collect(),
        });
    }

    let default_role = state.catalog.default_template()?.name.clone();
    render(
        jar,
        RolesTemplate {
            title: "Roles - Taskgate".to_string(),
            flash,
            page,
            users,
            role_names: state.catalog.names().map(str::to_string).collect(),
            default_role,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct ProvisionForm {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    pub role: String,
}

/// Add a user with a role from the catalog
pub async fn provision_account(
    State(state): State<AppState>,
    admin: CurrentUser,
    Form(form): Form<ProvisionForm>,
) -> WebResult<Response> {
    let user_id = form.user_id.trim();
    if user_id.is_empty() {
        return Ok(back_to_roles(Flash::error("Enter a user id.")));
    }

    let display_name = Some(form.display_name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    rejected(add_user(&state, &admin, user_id, display_name, &form.role).await)
}

async fn add_user(
    state: &AppState,
    admin: &CurrentUser,
    user_id: &str,
    display_name: Option<String>,
    role_name: &str,
) -> RbacResult<Response> {
    let user = User::new(user_id.parse::<UserId>()?, display_name);
    let template = state.catalog.get(role_name)?;
    let role = provision::provision_user(state.store().as_ref(), &user, template).await?;
    info!(admin = %admin.id(), user = %user.id, role = %role.name, "User provisioned");

    Ok(back_to_roles(Flash::success(format!(
        "Added {} as {}.",
        user.id, role.name
    ))))
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// Move a user to another role template
pub async fn assign_role(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<String>,
    Form(form): Form<RoleForm>,
) -> WebResult<Response> {
    rejected(move_user(&state, &admin, &UserId::from(user_id), &form.role).await)
}

async fn move_user(
    state: &AppState,
    admin: &CurrentUser,
    user_id: &UserId,
    role_name: &str,
) -> RbacResult<Response> {
    let template = state.catalog.get(role_name)?;
    let role = provision::change_role(state.store().as_ref(), user_id, template).await?;
    info!(admin = %admin.id(), user = %user_id, role = %role.name, "Role changed by admin");

    Ok(back_to_roles(Flash::success(format!(
        "{} is now {}.",
        user_id, role.name
    ))))
}

#[derive(Debug, Deserialize)]
pub struct PermissionForm {
    pub kind: String,
}

pub async fn grant_permission(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<String>,
    Form(form): Form<PermissionForm>,
) -> WebResult<Response> {
    rejected(grant(&state, &admin, &UserId::from(user_id), &form.kind).await)
}

async fn grant(
    state: &AppState,
    admin: &CurrentUser,
    user_id: &UserId,
    kind: &str,
) -> RbacResult<Response> {
    let kind: PermissionKind = kind.parse()?;
    let Some(role) = state.resolver.role_of(user_id).await? else {
        return Ok(back_to_roles(Flash::error(format!(
            "{} has no role to grant {} to.",
            user_id, kind
        ))));
    };

    state.store().grant_permission(role.id, kind).await?;
    info!(
        admin = %admin.id(),
        user = %user_id,
        role = %role.name,
        permission = %kind,
        "Permission granted"
    );

    Ok(back_to_roles(Flash::success(format!(
        "Granted {} to {}.",
        kind, user_id
    ))))
}

pub async fn revoke_permission(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<String>,
    Form(form): Form<PermissionForm>,
) -> WebResult<Response> {
    rejected(revoke(&state, &admin, &UserId::from(user_id), &form.kind).await)
}

async fn revoke(
    state: &AppState,
    admin: &CurrentUser,
    user_id: &UserId,
    kind: &str,
) -> RbacResult<Response> {
    let kind: PermissionKind = kind.parse()?;
    let revoked = match state.resolver.role_of(user_id).await? {
        Some(role) => state.store().revoke_permission(role.id, kind).await?,
        None => false,
    };

    if !revoked {
        return Ok(back_to_roles(Flash::error(format!(
            "{} does not hold {}.",
            user_id, kind
        ))));
    }

    info!(admin = %admin.id(), user = %user_id, permission = %kind, "Permission revoked");
    Ok(back_to_roles(Flash::success(format!(
        "Revoked {} from {}.",
        kind, user_id
    ))))
}

/// Delete a user; their role and grants go with them
pub async fn remove_account(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(user_id): Path<String>,
) -> WebResult<Response> {
    let user_id = UserId::from(user_id);
    if &user_id == admin.id() {
        return Ok(back_to_roles(Flash::error(
            "You cannot remove your own account.",
        )));
    }

    if !state.store().delete_user(&user_id).await? {
        return Ok(back_to_roles(Flash::error(format!(
            "User '{}' not found.",
            user_id
        ))));
    }

    info!(admin = %admin.id(), user = %user_id, "User removed");
    Ok(back_to_roles(Flash::success(format!("Removed {}.", user_id))))
}
