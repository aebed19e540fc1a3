//! The fixed permission enumeration

use crate::error::RbacError;
use serde::{Deserialize, Serialize};

/// One of the four action categories a role can be granted.
///
/// The string forms are the storage and route-tag representation and are
/// matched exactly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum PermissionKind {
    Create,
    Retrieve,
    Update,
    Delete,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 4] = [
        PermissionKind::Create,
        PermissionKind::Retrieve,
        PermissionKind::Update,
        PermissionKind::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Create => "Create",
            PermissionKind::Retrieve => "Retrieve",
            PermissionKind::Update => "Update",
            PermissionKind::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionKind {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Create" => Ok(PermissionKind::Create),
            "Retrieve" => Ok(PermissionKind::Retrieve),
            "Update" => Ok(PermissionKind::Update),
            "Delete" => Ok(PermissionKind::Delete),
            _ => Err(RbacError::UnknownPermission(s.to_string())),
        }
    }
}
