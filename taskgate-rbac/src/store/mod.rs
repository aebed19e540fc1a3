//! Role Store and Permission Store
//!
//! Both stores share one trait so a single backend owns the cascade from
//! users to roles to permission grants.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryRbacStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRbacStore;

use crate::error::RbacResult;
use crate::model::{NewRole, Permission, Role, User, UserId};
use crate::permission::PermissionKind;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Persistent users, roles and grants.
///
/// Invariants every backend upholds:
/// - at most one role per user ([`RbacError::DuplicateRole`](crate::RbacError::DuplicateRole))
/// - at most one grant per (role, kind) ([`RbacError::DuplicatePermission`](crate::RbacError::DuplicatePermission))
/// - deleting a user deletes their role, deleting a role deletes its grants
/// - the multi-record writes below either fully apply or leave no trace
#[async_trait]
pub trait RbacStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> RbacResult<()>;

    async fn get_user(&self, user_id: &UserId) -> RbacResult<Option<User>>;

    async fn list_users(&self) -> RbacResult<Vec<User>>;

    /// Returns whether a user was removed
    async fn delete_user(&self, user_id: &UserId) -> RbacResult<bool>;

    async fn create_role(&self, role: &NewRole) -> RbacResult<Role>;

    async fn update_role(
        &self,
        role_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> RbacResult<Role>;

    /// Returns whether a role was removed
    async fn delete_role(&self, role_id: i64) -> RbacResult<bool>;

    async fn role_for_user(&self, user_id: &UserId) -> RbacResult<Option<Role>>;

    async fn list_roles(&self) -> RbacResult<Vec<Role>>;

    async fn grant_permission(&self, role_id: i64, kind: PermissionKind)
        -> RbacResult<Permission>;

    /// Returns whether a grant was removed
    async fn revoke_permission(&self, role_id: i64, kind: PermissionKind) -> RbacResult<bool>;

    async fn permissions_for_role(&self, role_id: i64) -> RbacResult<BTreeSet<PermissionKind>>;

    async fn has_grant(&self, role_id: i64, kind: PermissionKind) -> RbacResult<bool>;

    /// Insert `user`, their role and its grants as one write; on error
    /// nothing is stored
    async fn create_user_with_role(
        &self,
        user: &User,
        role: &NewRole,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role>;

    /// Give an existing, role-less user a role and its grants as one write
    async fn create_role_with_grants(
        &self,
        role: &NewRole,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role>;

    /// Rename a role and make its grants exactly `kinds`, as one write
    async fn replace_role(
        &self,
        role_id: i64,
        name: &str,
        description: Option<&str>,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role>;
}
