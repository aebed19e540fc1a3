//! Presentation gate
//!
//! Decides which action controls a page may render. Hiding a control is a
//! usability aid only; the routes behind those controls are gated separately.

use crate::error::RbacResult;
use crate::model::UserId;
use crate::permission::PermissionKind;
use crate::resolver::PermissionResolver;
use serde::Serialize;
use std::collections::BTreeSet;

/// Which task controls the current user may see
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionControls {
    pub can_create: bool,
    pub can_retrieve: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl ActionControls {
    pub fn from_permissions(held: &BTreeSet<PermissionKind>) -> Self {
        Self {
            can_create: held.contains(&PermissionKind::Create),
            can_retrieve: held.contains(&PermissionKind::Retrieve),
            can_update: held.contains(&PermissionKind::Update),
            can_delete: held.contains(&PermissionKind::Delete),
        }
    }

    /// One lookup per page rather than one per control
    pub async fn for_user(resolver: &PermissionResolver, user: &UserId) -> RbacResult<Self> {
        let held = resolver.permissions_of(user).await?;
        Ok(Self::from_permissions(&held))
    }

    pub fn allows(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Create => self.can_create,
            PermissionKind::Retrieve => self.can_retrieve,
            PermissionKind::Update => self.can_update,
            PermissionKind::Delete => self.can_delete,
        }
    }

    /// Whether any row-level control (edit or delete) is visible
    pub fn any_row_action(&self) -> bool {
        self.can_update || self.can_delete
    }
}
