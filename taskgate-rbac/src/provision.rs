//! Role templates and role management
//!
//! A role template is the named permission set copied onto a user's role
//! record when the user is provisioned or moved to another role.

use crate::error::{RbacError, RbacResult};
use crate::model::{NewRole, Role, User, UserId, ADMINISTRATOR_ROLE};
use crate::permission::PermissionKind;
use crate::store::RbacStore;
use std::collections::{BTreeMap, BTreeSet};
use taskgate_core::{
    log_operation_error, log_operation_start, log_operation_success, RbacConfig,
    RoleTemplateConfig,
};
use tracing::info;

/// Named permission set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTemplate {
    pub name: String,
    pub description: Option<String>,
    pub permissions: BTreeSet<PermissionKind>,
}

impl RoleTemplate {
    pub fn new(
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = PermissionKind>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Every permission kind
    pub fn administrator() -> Self {
        Self::new(ADMINISTRATOR_ROLE, PermissionKind::ALL)
    }

    pub fn from_config(config: &RoleTemplateConfig) -> RbacResult<Self> {
        let permissions = config
            .permissions
            .iter()
            .map(|name| name.parse())
            .collect::<RbacResult<BTreeSet<PermissionKind>>>()?;

        Ok(Self {
            name: config.name.clone(),
            description: config.description.clone(),
            permissions,
        })
    }

    fn to_new_role(&self, user_id: &UserId) -> NewRole {
        NewRole {
            user_id: user_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Role templates available to provisioning and admin role changes
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    templates: BTreeMap<String, RoleTemplate>,
    default_role: String,
}

impl RoleCatalog {
    pub fn from_config(config: &RbacConfig) -> RbacResult<Self> {
        let mut templates = BTreeMap::new();
        for template in &config.templates {
            let parsed = RoleTemplate::from_config(template)?;
            templates.insert(parsed.name.clone(), parsed);
        }

        let catalog = Self {
            templates,
            default_role: config.default_role.clone(),
        };
        catalog.get(&catalog.default_role)?;
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> RbacResult<&RoleTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| RbacError::UnknownRoleTemplate(name.to_string()))
    }

    pub fn default_template(&self) -> RbacResult<&RoleTemplate> {
        self.get(&self.default_role)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// The configured administrator template, or the built-in full grant
    pub fn administrator(&self) -> RoleTemplate {
        self.templates
            .get(ADMINISTRATOR_ROLE)
            .cloned()
            .unwrap_or_else(RoleTemplate::administrator)
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        // The default RbacConfig only names known permission kinds.
        Self::from_config(&RbacConfig::default()).unwrap_or_else(|_| Self {
            templates: BTreeMap::from([(
                ADMINISTRATOR_ROLE.to_string(),
                RoleTemplate::administrator(),
            )]),
            default_role: ADMINISTRATOR_ROLE.to_string(),
        })
    }
}

/// Give an existing, role-less user a role built from `template`
pub async fn assign_role(
    store: &dyn RbacStore,
    user_id: &UserId,
    template: &RoleTemplate,
) -> RbacResult<Role> {
    let role = store
        .create_role_with_grants(&template.to_new_role(user_id), &template.permissions)
        .await?;

    info!(user = %user_id, role = %role.name, "Role assigned");
    Ok(role)
}

/// Insert a new user with a role built from `template`. Nothing is stored
/// when any part fails, so a retry starts clean.
pub async fn provision_user(
    store: &dyn RbacStore,
    user: &User,
    template: &RoleTemplate,
) -> RbacResult<Role> {
    let role = store
        .create_user_with_role(user, &template.to_new_role(&user.id), &template.permissions)
        .await?;

    info!(user = %user.id, role = %role.name, "User provisioned");
    Ok(role)
}

/// Move a user to `template`: rename their role and reconcile its grants.
/// Users without a role get one.
pub async fn change_role(
    store: &dyn RbacStore,
    user_id: &UserId,
    template: &RoleTemplate,
) -> RbacResult<Role> {
    let Some(current) = store.role_for_user(user_id).await? else {
        if store.get_user(user_id).await?.is_none() {
            return Err(RbacError::UserNotFound(user_id.clone()));
        }
        return assign_role(store, user_id, template).await;
    };

    let role = store
        .replace_role(
            current.id,
            &template.name,
            template.description.as_deref(),
            &template.permissions,
        )
        .await?;

    info!(user = %user_id, from = %current.name, to = %role.name, "Role changed");
    Ok(role)
}

/// Make sure `user_id` exists and holds the administrator role
pub async fn ensure_admin(
    store: &dyn RbacStore,
    user_id: &UserId,
    catalog: &RoleCatalog,
) -> RbacResult<Role> {
    log_operation_start!("ensure_admin", user = %user_id);
    let template = catalog.administrator();

    let result = if store.get_user(user_id).await?.is_none() {
        let user = User::new(user_id.clone(), Some("Administrator".to_string()));
        provision_user(store, &user, &template).await
    } else {
        match store.role_for_user(user_id).await? {
            Some(role) if role.is_administrator() => Ok(role),
            _ => change_role(store, user_id, &template).await,
        }
    };

    match &result {
        Ok(_) => {
            log_operation_success!("ensure_admin", user = %user_id);
        }
        Err(e) => {
            log_operation_error!("ensure_admin", e, user = %user_id);
        }
    }
    result
}
