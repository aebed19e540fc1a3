//! Permission Resolver
//!
//! Read-only answers to "does this user hold role R?" and "does this user hold
//! permission P?". The identity is always passed in explicitly; the resolver
//! assumes the caller has already authenticated it.

use crate::error::RbacResult;
use crate::model::{Role, UserId, ADMINISTRATOR_ROLE};
use crate::permission::PermissionKind;
use crate::store::RbacStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Resolves roles and permissions for an identity
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn RbacStore>,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver").finish_non_exhaustive()
    }
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self { store }
    }

    /// Underlying store, for admin-side writes
    pub fn store(&self) -> &Arc<dyn RbacStore> {
        &self.store
    }

    /// The user's single role, or `None` when unassigned or unknown
    pub async fn role_of(&self, user: &UserId) -> RbacResult<Option<Role>> {
        self.store.role_for_user(user).await
    }

    /// True iff the user's role exists and is named exactly `role_name`
    pub async fn has_role(&self, user: &UserId, role_name: &str) -> RbacResult<bool> {
        let held = self
            .role_of(user)
            .await?
            .is_some_and(|role| role.is_named(role_name));

        debug!(user = %user, role = role_name, held, "Resolved role check");
        Ok(held)
    }

    /// True iff the user has a role and that role grants `kind`
    pub async fn has_permission(&self, user: &UserId, kind: PermissionKind) -> RbacResult<bool> {
        let Some(role) = self.role_of(user).await? else {
            debug!(user = %user, permission = %kind, "No role assigned");
            return Ok(false);
        };

        let held = self.store.has_grant(role.id, kind).await?;
        debug!(
            user = %user,
            role = %role.name,
            permission = %kind,
            held,
            "Resolved permission check"
        );
        Ok(held)
    }

    pub async fn is_admin(&self, user: &UserId) -> RbacResult<bool> {
        self.has_role(user, ADMINISTRATOR_ROLE).await
    }

    /// Every kind the user holds; empty without a role
    pub async fn permissions_of(&self, user: &UserId) -> RbacResult<BTreeSet<PermissionKind>> {
        match self.role_of(user).await? {
            Some(role) => self.store.permissions_for_role(role.id).await,
            None => Ok(BTreeSet::new()),
        }
    }
}
