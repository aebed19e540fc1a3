//! Taskgate RBAC
//!
//! One role per user, four fixed permission kinds, and the read path that turns
//! them into allow/deny answers:
//! - [`store`]: persistent users, roles and permission grants
//! - [`resolver`]: "does this user hold role R / permission P?"
//! - [`presentation`]: which action controls a page may render
//! - [`provision`]: role templates and admin role management

pub mod error;
pub mod model;
pub mod permission;
pub mod presentation;
pub mod provision;
pub mod resolver;
pub mod store;

pub use error::{RbacError, RbacResult};
pub use model::{NewRole, Permission, Role, User, UserId, ADMINISTRATOR_ROLE};
pub use permission::PermissionKind;
pub use presentation::ActionControls;
pub use provision::{RoleCatalog, RoleTemplate};
pub use resolver::PermissionResolver;
pub use store::{MemoryRbacStore, RbacStore};

#[cfg(feature = "sqlite")]
pub use store::SqliteRbacStore;
