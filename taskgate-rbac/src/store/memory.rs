//! In-process store for development and tests

use super::RbacStore;
use crate::error::{RbacError, RbacResult};
use crate::model::{NewRole, Permission, Role, User, UserId};
use crate::permission::PermissionKind;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    roles: BTreeMap<i64, Role>,
    grants: BTreeMap<(i64, PermissionKind), Permission>,
    next_role_id: i64,
    next_permission_id: i64,
}

impl MemoryState {
    fn check_new_role(&self, role: &NewRole) -> RbacResult<()> {
        if !self.users.contains_key(&role.user_id) {
            return Err(RbacError::UserNotFound(role.user_id.clone()));
        }
        if self.roles.values().any(|r| r.user_id == role.user_id) {
            return Err(RbacError::DuplicateRole(role.user_id.clone()));
        }
        Ok(())
    }

    /// Callers check first; the insert itself cannot fail
    fn insert_role(&mut self, role: &NewRole) -> Role {
        self.next_role_id += 1;
        let created = Role {
            id: self.next_role_id,
            user_id: role.user_id.clone(),
            name: role.name.clone(),
            description: role.description.clone(),
        };
        self.roles.insert(created.id, created.clone());
        created
    }

    fn insert_grant(&mut self, role_id: i64, kind: PermissionKind) -> Permission {
        self.next_permission_id += 1;
        let permission = Permission {
            id: self.next_permission_id,
            role_id,
            kind,
        };
        self.grants.insert((role_id, kind), permission);
        permission
    }

    fn remove_role(&mut self, role_id: i64) -> bool {
        if self.roles.remove(&role_id).is_none() {
            return false;
        }
        self.grants.retain(|(owner, _), _| *owner != role_id);
        true
    }
}

/// Store keeping everything behind one lock, so each write is atomic
#[derive(Debug, Clone, Default)]
pub struct MemoryRbacStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRbacStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RbacStore for MemoryRbacStore {
    async fn insert_user(&self, user: &User) -> RbacResult<()> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) {
            return Err(RbacError::DuplicateUser(user.id.clone()));
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> RbacResult<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn list_users(&self) -> RbacResult<Vec<User>> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn delete_user(&self, user_id: &UserId) -> RbacResult<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(user_id).is_none() {
            return Ok(false);
        }
        let owned: Vec<i64> = state
            .roles
            .values()
            .filter(|role| &role.user_id == user_id)
            .map(|role| role.id)
            .collect();
        for role_id in owned {
            state.remove_role(role_id);
        }
        Ok(true)
    }

    async fn create_role(&self, role: &NewRole) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        state.check_new_role(role)?;
        Ok(state.insert_role(role))
    }

    async fn update_role(
        &self,
        role_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .get_mut(&role_id)
            .ok_or(RbacError::RoleNotFound(role_id))?;
        role.name = name.to_string();
        role.description = description.map(str::to_string);
        Ok(role.clone())
    }

    async fn delete_role(&self, role_id: i64) -> RbacResult<bool> {
        Ok(self.state.write().await.remove_role(role_id))
    }

    async fn role_for_user(&self, user_id: &UserId) -> RbacResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .values()
            .find(|role| &role.user_id == user_id)
            .cloned())
    }

    async fn list_roles(&self) -> RbacResult<Vec<Role>> {
        Ok(self.state.read().await.roles.values().cloned().collect())
    }

    async fn grant_permission(
        &self,
        role_id: i64,
        kind: PermissionKind,
    ) -> RbacResult<Permission> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&role_id) {
            return Err(RbacError::RoleNotFound(role_id));
        }
        if state.grants.contains_key(&(role_id, kind)) {
            return Err(RbacError::DuplicatePermission { role_id, kind });
        }
        Ok(state.insert_grant(role_id, kind))
    }

    async fn revoke_permission(&self, role_id: i64, kind: PermissionKind) -> RbacResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .grants
            .remove(&(role_id, kind))
            .is_some())
    }

    async fn permissions_for_role(&self, role_id: i64) -> RbacResult<BTreeSet<PermissionKind>> {
        let state = self.state.read().await;
        Ok(state
            .grants
            .keys()
            .filter(|(owner, _)| *owner == role_id)
            .map(|(_, kind)| *kind)
            .collect())
    }

    async fn has_grant(&self, role_id: i64, kind: PermissionKind) -> RbacResult<bool> {
        Ok(self.state.read().await.grants.contains_key(&(role_id, kind)))
    }

    async fn create_user_with_role(
        &self,
        user: &User,
        role: &NewRole,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) {
            return Err(RbacError::DuplicateUser(user.id.clone()));
        }
        if role.user_id != user.id {
            return Err(RbacError::UserNotFound(role.user_id.clone()));
        }

        state.users.insert(user.id.clone(), user.clone());
        let created = state.insert_role(role);
        for kind in kinds {
            state.insert_grant(created.id, *kind);
        }
        Ok(created)
    }

    async fn create_role_with_grants(
        &self,
        role: &NewRole,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        state.check_new_role(role)?;

        let created = state.insert_role(role);
        for kind in kinds {
            state.insert_grant(created.id, *kind);
        }
        Ok(created)
    }

    async fn replace_role(
        &self,
        role_id: i64,
        name: &str,
        description: Option<&str>,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .get_mut(&role_id)
            .ok_or(RbacError::RoleNotFound(role_id))?;
        role.name = name.to_string();
        role.description = description.map(str::to_string);
        let updated = role.clone();

        state
            .grants
            .retain(|(owner, kind), _| *owner != role_id || kinds.contains(kind));
        for kind in kinds {
            if !state.grants.contains_key(&(role_id, *kind)) {
                state.insert_grant(role_id, *kind);
            }
        }
        Ok(updated)
    }
}
