//! Error types for role and permission management

use crate::model::UserId;
use crate::permission::PermissionKind;
use thiserror::Error;

/// Result type alias for RBAC operations
pub type RbacResult<T> = Result<T, RbacError>;

/// Errors raised by the stores and the admin-facing operations.
///
/// The resolver only ever surfaces [`RbacError::Storage`]; a user without a
/// role is an answer, not an error.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RbacError {
    #[error("User '{0}' already exists")]
    DuplicateUser(UserId),

    #[error("User '{0}' already has a role")]
    DuplicateRole(UserId),

    #[error("Role {role_id} already grants {kind}")]
    DuplicatePermission { role_id: i64, kind: PermissionKind },

    #[error("User '{0}' not found")]
    UserNotFound(UserId),

    #[error("Invalid user id '{0}': use 1 to 64 letters, digits, '-', '_', '.' or '@'")]
    InvalidUserId(String),

    #[error("Role {0} not found")]
    RoleNotFound(i64),

    #[error("Unknown permission kind: {0}")]
    UnknownPermission(String),

    #[error("Unknown role template: {0}")]
    UnknownRoleTemplate(String),

    #[cfg(feature = "sqlite")]
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl RbacError {
    /// Whether the error is a uniqueness rejection from the storage boundary
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RbacError::DuplicateUser(_)
                | RbacError::DuplicateRole(_)
                | RbacError::DuplicatePermission { .. }
        )
    }
}
