//! Command implementations
//!
//! Each command returns the text to print so it can be tested without a
//! terminal.

use anyhow::{bail, Context as _, Result};
use std::fmt::Write as _;
use std::sync::Arc;
use taskgate_core::{log_operation_start, log_operation_success};
use taskgate_rbac::{
    provision, PermissionKind, PermissionResolver, RbacStore, RoleCatalog, User, UserId,
};

/// Store, resolver and role templates shared by every command
pub struct Context {
    pub resolver: PermissionResolver,
    pub catalog: RoleCatalog,
}

impl Context {
    pub fn new(store: Arc<dyn RbacStore>, catalog: RoleCatalog) -> Self {
        Self {
            resolver: PermissionResolver::new(store),
            catalog,
        }
    }

    fn store(&self) -> &dyn RbacStore {
        self.resolver.store().as_ref()
    }
}

/// What `check` asks about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Role(String),
    Permission(PermissionKind),
}

/// Add a user; `role` defaults to the catalog's default template
pub async fn user_add(
    ctx: &Context,
    id: &str,
    name: Option<String>,
    role: Option<&str>,
    no_role: bool,
) -> Result<String> {
    log_operation_start!("user_add", user = id);
    let user = User::new(id.parse::<UserId>()?, name);

    if no_role {
        ctx.store().insert_user(&user).await?;
        log_operation_success!("user_add", user = id);
        return Ok(format!("Added {} without a role", user.id));
    }

    let template = match role {
        Some(name) => ctx.catalog.get(name)?,
        None => ctx.catalog.default_template()?,
    };
    let role = provision::provision_user(ctx.store(), &user, template).await?;

    log_operation_success!("user_add", user = id, role = %role.name);
    Ok(format!("Added {} as {}", user.id, role.name))
}

pub async fn user_remove(ctx: &Context, id: &str) -> Result<String> {
    if !ctx.store().delete_user(&UserId::from(id)).await? {
        bail!("User '{}' not found", id);
    }
    Ok(format!("Removed {}", id))
}

pub async fn user_list(ctx: &Context) -> Result<String> {
    let mut out = String::new();
    for user in ctx.store().list_users().await? {
        let role = ctx.resolver.role_of(&user.id).await?;
        writeln!(
            out,
            "{:<20} {:<20} {}",
            user.id,
            user.label(),
            role.map(|r| r.name).unwrap_or_else(|| "-".to_string())
        )?;
    }
    Ok(out)
}

/// Move a user to a role template, creating the role if they had none
pub async fn role_assign(ctx: &Context, user: &str, template: &str) -> Result<String> {
    let template = ctx.catalog.get(template)?;
    let role = provision::change_role(ctx.store(), &UserId::from(user), template).await?;
    Ok(format!("{} is now {}", user, role.name))
}

pub async fn role_show(ctx: &Context, user: &str) -> Result<String> {
    let user_id = UserId::from(user);
    if ctx.store().get_user(&user_id).await?.is_none() {
        bail!("User '{}' not found", user);
    }

    let Some(role) = ctx.resolver.role_of(&user_id).await? else {
        return Ok(format!("{} has no role", user));
    };
    let held = ctx.resolver.permissions_of(&user_id).await?;
    let kinds: Vec<_> = held.iter().map(PermissionKind::as_str).collect();

    Ok(format!(
        "{}: {} [{}]",
        user,
        role.name,
        if kinds.is_empty() { "none".to_string() } else { kinds.join(", ") }
    ))
}

pub fn role_templates(ctx: &Context) -> Result<String> {
    let mut out = String::new();
    for name in ctx.catalog.names() {
        let template = ctx.catalog.get(name)?;
        let kinds: Vec<_> = template.permissions.iter().map(PermissionKind::as_str).collect();
        writeln!(out, "{:<16} {}", name, kinds.join(", "))?;
    }
    Ok(out)
}

pub async fn grant(ctx: &Context, user: &str, kind: &str) -> Result<String> {
    let kind: PermissionKind = kind.parse()?;
    let role = ctx
        .resolver
        .role_of(&UserId::from(user))
        .await?
        .with_context(|| format!("{} has no role to grant {} to", user, kind))?;

    ctx.store().grant_permission(role.id, kind).await?;
    Ok(format!("Granted {} to {} ({})", kind, user, role.name))
}

pub async fn revoke(ctx: &Context, user: &str, kind: &str) -> Result<String> {
    let kind: PermissionKind = kind.parse()?;
    let revoked = match ctx.resolver.role_of(&UserId::from(user)).await? {
        Some(role) => ctx.store().revoke_permission(role.id, kind).await?,
        None => false,
    };

    if !revoked {
        bail!("{} does not hold {}", user, kind);
    }
    Ok(format!("Revoked {} from {}", kind, user))
}

/// Same answer a route gate would give
pub async fn check(ctx: &Context, user: &str, requirement: &Requirement) -> Result<bool> {
    let user_id = UserId::from(user);
    let allowed = match requirement {
        Requirement::Role(name) => ctx.resolver.has_role(&user_id, name).await?,
        Requirement::Permission(kind) => ctx.resolver.has_permission(&user_id, *kind).await?,
    };
    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_rbac::MemoryRbacStore;

    fn context() -> Context {
        Context::new(Arc::new(MemoryRbacStore::new()), RoleCatalog::default())
    }

    #[tokio::test]
    async fn test_user_add_uses_default_template() {
        let ctx = context();

        let out = user_add(&ctx, "alice", Some("Alice".into()), None, false)
            .await
            .unwrap();
        assert_eq!(out, "Added alice as User");
        assert_eq!(
            role_show(&ctx, "alice").await.unwrap(),
            "alice: User [Create, Retrieve]"
        );

        let err = user_add(&ctx, "alice", None, None, false).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_grant_revoke_and_check() {
        let ctx = context();
        user_add(&ctx, "bob", None, None, false).await.unwrap();
        let update = Requirement::Permission(PermissionKind::Update);

        assert!(!check(&ctx, "bob", &update).await.unwrap());
        grant(&ctx, "bob", "Update").await.unwrap();
        assert!(check(&ctx, "bob", &update).await.unwrap());

        revoke(&ctx, "bob", "Update").await.unwrap();
        assert!(!check(&ctx, "bob", &update).await.unwrap());
        assert!(revoke(&ctx, "bob", "Update").await.is_err());
        assert!(grant(&ctx, "bob", "update").await.is_err());
    }

    #[tokio::test]
    async fn test_roleless_user() {
        let ctx = context();
        user_add(&ctx, "carol", None, None, true).await.unwrap();

        assert_eq!(role_show(&ctx, "carol").await.unwrap(), "carol has no role");
        assert!(grant(&ctx, "carol", "Create").await.is_err());
        assert!(!check(&ctx, "carol", &Requirement::Role("User".into()))
            .await
            .unwrap());

        role_assign(&ctx, "carol", "Administrator").await.unwrap();
        assert!(check(&ctx, "carol", &Requirement::Role("Administrator".into()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_user_add_rejects_unroutable_id() {
        let ctx = context();

        let err = user_add(&ctx, "ops/team", None, None, false).await.unwrap_err();
        assert!(err.to_string().contains("Invalid user id"));
        assert!(user_list(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_user() {
        let ctx = context();
        assert!(user_remove(&ctx, "ghost").await.is_err());
        assert!(role_show(&ctx, "ghost").await.is_err());
    }

    #[test]
    fn test_templates_listing() {
        let out = role_templates(&context()).unwrap();
        assert!(out.contains("Administrator"));
        assert!(out
            .lines()
            .any(|line| line.starts_with("User") && line.ends_with("Create, Retrieve")));
    }
}
