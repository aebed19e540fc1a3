//! SQLite-backed store

use super::RbacStore;
use crate::error::{RbacError, RbacResult};
use crate::model::{NewRole, Permission, Role, User, UserId};
use crate::permission::PermissionKind;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{debug, error, info};

/// Database role record
#[derive(Debug, sqlx::FromRow)]
struct RoleRecord {
    id: i64,
    user_id: String,
    name: String,
    description: Option<String>,
}

impl From<RoleRecord> for Role {
    fn from(record: RoleRecord) -> Self {
        Self {
            id: record.id,
            user_id: UserId::from(record.user_id),
            name: record.name,
            description: record.description,
        }
    }
}

/// Database user record
#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: String,
    display_name: Option<String>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: UserId::from(record.id),
            display_name: record.display_name,
        }
    }
}

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        display_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS permissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        kind TEXT NOT NULL CHECK (kind IN ('Create', 'Retrieve', 'Update', 'Delete')),
        UNIQUE (role_id, kind)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_permissions_role ON permissions(role_id)",
];

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

// Statements shared by single writes and transactions

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> RbacResult<()> {
    sqlx::query("INSERT INTO users (id, display_name) VALUES (?, ?)")
        .bind(user.id.as_str())
        .bind(&user.display_name)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RbacError::DuplicateUser(user.id.clone())
            } else {
                RbacError::Storage(e)
            }
        })?;

    debug!("User inserted: {}", user.id);
    Ok(())
}

async fn insert_role(conn: &mut SqliteConnection, role: &NewRole) -> RbacResult<Role> {
    let result = sqlx::query("INSERT INTO roles (user_id, name, description) VALUES (?, ?, ?)")
        .bind(role.user_id.as_str())
        .bind(&role.name)
        .bind(&role.description)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RbacError::DuplicateRole(role.user_id.clone())
            } else if is_foreign_key_violation(&e) {
                RbacError::UserNotFound(role.user_id.clone())
            } else {
                RbacError::Storage(e)
            }
        })?;

    debug!("Role '{}' created for user: {}", role.name, role.user_id);
    Ok(Role {
        id: result.last_insert_rowid(),
        user_id: role.user_id.clone(),
        name: role.name.clone(),
        description: role.description.clone(),
    })
}

async fn insert_grant(
    conn: &mut SqliteConnection,
    role_id: i64,
    kind: PermissionKind,
) -> RbacResult<Permission> {
    let result = sqlx::query("INSERT INTO permissions (role_id, kind) VALUES (?, ?)")
        .bind(role_id)
        .bind(kind.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RbacError::DuplicatePermission { role_id, kind }
            } else if is_foreign_key_violation(&e) {
                RbacError::RoleNotFound(role_id)
            } else {
                RbacError::Storage(e)
            }
        })?;

    Ok(Permission {
        id: result.last_insert_rowid(),
        role_id,
        kind,
    })
}

async fn grants_of(
    conn: &mut SqliteConnection,
    role_id: i64,
) -> RbacResult<BTreeSet<PermissionKind>> {
    let rows = sqlx::query("SELECT kind FROM permissions WHERE role_id = ?")
        .bind(role_id)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| row.get::<String, _>("kind").parse::<PermissionKind>())
        .collect()
}

/// SQLite store for users, roles and permission grants
#[derive(Debug, Clone)]
pub struct SqliteRbacStore {
    pool: SqlitePool,
}

impl SqliteRbacStore {
    /// Connect to `database_url` and create the tables if needed.
    ///
    /// An in-memory database is held on a single connection that is never
    /// recycled; every other URL gets a small pool.
    pub async fn connect(database_url: &str) -> RbacResult<Self> {
        info!("Connecting to RBAC database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Self::new(pool).await
    }

    /// Wrap an existing pool; the pool must have foreign keys enabled
    pub async fn new(pool: SqlitePool) -> RbacResult<Self> {
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create_tables(&self) -> RbacResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to create RBAC tables: {}", e);
                    RbacError::Storage(e)
                })?;
        }

        debug!("RBAC tables ready");
        Ok(())
    }

    async fn fetch_role(&self, role_id: i64) -> RbacResult<Option<Role>> {
        let record = sqlx::query_as::<_, RoleRecord>(
            "SELECT id, user_id, name, description FROM roles WHERE id = ?",
        )
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Role::from))
    }
}

#[async_trait]
impl RbacStore for SqliteRbacStore {
    async fn insert_user(&self, user: &User) -> RbacResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, user).await
    }

    async fn get_user(&self, user_id: &UserId) -> RbacResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, display_name FROM users WHERE id = ?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::from))
    }

    async fn list_users(&self) -> RbacResult<Vec<User>> {
        let records =
            sqlx::query_as::<_, UserRecord>("SELECT id, display_name FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(records.into_iter().map(User::from).collect())
    }

    async fn delete_user(&self, user_id: &UserId) -> RbacResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_role(&self, role: &NewRole) -> RbacResult<Role> {
        let mut conn = self.pool.acquire().await?;
        insert_role(&mut conn, role).await
    }

    async fn update_role(
        &self,
        role_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> RbacResult<Role> {
        let result = sqlx::query("UPDATE roles SET name = ?, description = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RbacError::RoleNotFound(role_id));
        }

        self.fetch_role(role_id)
            .await?
            .ok_or(RbacError::RoleNotFound(role_id))
    }

    async fn delete_role(&self, role_id: i64) -> RbacResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn role_for_user(&self, user_id: &UserId) -> RbacResult<Option<Role>> {
        let record = sqlx::query_as::<_, RoleRecord>(
            "SELECT id, user_id, name, description FROM roles WHERE user_id = ?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Role::from))
    }

    async fn list_roles(&self) -> RbacResult<Vec<Role>> {
        let records = sqlx::query_as::<_, RoleRecord>(
            "SELECT id, user_id, name, description FROM roles ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Role::from).collect())
    }

    async fn grant_permission(
        &self,
        role_id: i64,
        kind: PermissionKind,
    ) -> RbacResult<Permission> {
        let mut conn = self.pool.acquire().await?;
        insert_grant(&mut conn, role_id, kind).await
    }

    async fn revoke_permission(&self, role_id: i64, kind: PermissionKind) -> RbacResult<bool> {
        let result = sqlx::query("DELETE FROM permissions WHERE role_id = ? AND kind = ?")
            .bind(role_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn permissions_for_role(&self, role_id: i64) -> RbacResult<BTreeSet<PermissionKind>> {
        let mut conn = self.pool.acquire().await?;
        grants_of(&mut conn, role_id).await
    }

    async fn has_grant(&self, role_id: i64, kind: PermissionKind) -> RbacResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM permissions WHERE role_id = ? AND kind = ?",
        )
        .bind(role_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn create_user_with_role(
        &self,
        user: &User,
        role: &NewRole,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role> {
        let mut tx = self.pool.begin().await?;

        insert_user(&mut tx, user).await?;
        let created = insert_role(&mut tx, role).await?;
        for kind in kinds {
            insert_grant(&mut tx, created.id, *kind).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn create_role_with_grants(
        &self,
        role: &NewRole,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role> {
        let mut tx = self.pool.begin().await?;

        let created = insert_role(&mut tx, role).await?;
        for kind in kinds {
            insert_grant(&mut tx, created.id, *kind).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn replace_role(
        &self,
        role_id: i64,
        name: &str,
        description: Option<&str>,
        kinds: &BTreeSet<PermissionKind>,
    ) -> RbacResult<Role> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, RoleRecord>(
            "UPDATE roles SET name = ?, description = ? WHERE id = ? \
             RETURNING id, user_id, name, description",
        )
        .bind(name)
        .bind(description)
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RbacError::RoleNotFound(role_id))?;

        let held = grants_of(&mut tx, role_id).await?;
        for kind in held.difference(kinds) {
            sqlx::query("DELETE FROM permissions WHERE role_id = ? AND kind = ?")
                .bind(role_id)
                .bind(kind.as_str())
                .execute(&mut *tx)
                .await?;
        }
        for kind in kinds.difference(&held) {
            insert_grant(&mut tx, role_id, *kind).await?;
        }

        tx.commit().await?;
        Ok(Role::from(record))
    }
}
