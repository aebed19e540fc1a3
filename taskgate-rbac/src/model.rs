//! Users, roles and permission grants

use crate::error::RbacError;
use crate::permission::PermissionKind;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Name of the privileged role
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

const MAX_USER_ID_LEN: usize = 64;

/// Authenticated identity supplied by the login collaborator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsing is for ids entering the system (admin forms, the CLI). Ids are
/// used as URL path segments, so only characters that need no escaping pass.
impl FromStr for UserId {
    type Err = RbacError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let valid = !id.is_empty()
            && id.len() <= MAX_USER_ID_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));

        if valid {
            Ok(Self::new(id))
        } else {
            Err(RbacError::InvalidUserId(id.to_string()))
        }
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A user as far as access control is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: Option<String>,
}

impl User {
    pub fn new(id: impl Into<UserId>, display_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            display_name,
        }
    }

    /// Display name, falling back to the identity
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// The single role record owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
}

impl Role {
    /// Exact, case-sensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn is_administrator(&self) -> bool {
        self.is_named(ADMINISTRATOR_ROLE)
    }
}

/// Role record to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
}

impl NewRole {
    pub fn new(user_id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One (role, kind) grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub role_id: i64,
    pub kind: PermissionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parsing() {
        for id in ["alice", "bob.smith", "erin_2", "ops-team", "carol@example.com"] {
            assert_eq!(id.parse::<UserId>().unwrap().as_str(), id);
        }

        let too_long = "x".repeat(MAX_USER_ID_LEN + 1);
        for id in ["", "a/b", "who?", "frag#1", "two words", "caf\u{e9}", too_long.as_str()] {
            assert!(
                matches!(id.parse::<UserId>(), Err(RbacError::InvalidUserId(_))),
                "{:?}",
                id
            );
        }
    }

    #[test]
    fn test_role_name_match_is_exact() {
        let role = Role {
            id: 1,
            user_id: UserId::from("alice"),
            name: "administrator".to_string(),
            description: None,
        };

        assert!(role.is_named("administrator"));
        assert!(!role.is_administrator());
    }

    #[test]
    fn test_user_label_falls_back_to_id() {
        assert_eq!(User::new("bob", None).label(), "bob");
        assert_eq!(User::new("bob", Some("Bob".to_string())).label(), "Bob");
    }
}
