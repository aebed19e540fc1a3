//! Application state shared by every handler and gate

use crate::auth::CurrentUser;
use crate::tasks::TaskStore;
use crate::WebResult;
use std::sync::Arc;
use taskgate_core::TaskgateConfig;
use taskgate_rbac::{
    provision, ActionControls, PermissionResolver, RbacError, RbacStore, RoleCatalog,
    SqliteRbacStore, User, UserId,
};
use tracing::{debug, info};

/// Users created on start in development mode: id, display name, template
const DEMO_USERS: &[(&str, &str, Option<&str>)] = &[
    ("alice", "Alice", Some("User")),
    ("bob", "Bob", None),
];

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TaskgateConfig>,
    /// Read path for gates and pages; also owns the store handle
    pub resolver: PermissionResolver,
    /// Templates for provisioning and role changes
    pub catalog: Arc<RoleCatalog>,
    pub tasks: TaskStore,
}

/// Values every page layout needs
#[derive(Debug, Clone)]
pub struct PageContext {
    pub user_label: String,
    pub is_admin: bool,
    pub controls: ActionControls,
}

impl AppState {
    /// Connect to the configured database and prepare the access tables
    pub async fn new(config: TaskgateConfig) -> WebResult<Self> {
        let store = SqliteRbacStore::connect(&config.database.url).await?;
        info!(url = %config.database.url, "Access control database ready");
        Self::with_store(config, Arc::new(store)).await
    }

    /// Build state over an existing store
    pub async fn with_store(config: TaskgateConfig, store: Arc<dyn RbacStore>) -> WebResult<Self> {
        config.validate()?;
        let catalog = RoleCatalog::from_config(&config.rbac)?;

        if let Some(admin) = &config.rbac.bootstrap_admin {
            let role =
                provision::ensure_admin(store.as_ref(), &UserId::from(admin.as_str()), &catalog)
                    .await?;
            info!(user = %admin, role = %role.name, "Bootstrap administrator ready");
        }

        if config.server.dev_mode {
            seed_demo_users(store.as_ref(), &catalog).await?;
        }

        Ok(Self {
            config: Arc::new(config),
            resolver: PermissionResolver::new(store),
            catalog: Arc::new(catalog),
            tasks: TaskStore::new(),
        })
    }

    pub fn store(&self) -> &Arc<dyn RbacStore> {
        self.resolver.store()
    }

    /// Layout values for `user`, with one permission lookup for the page
    pub async fn page_context(&self, user: &CurrentUser) -> WebResult<PageContext> {
        let controls = ActionControls::for_user(&self.resolver, user.id()).await?;
        let is_admin = self.resolver.is_admin(user.id()).await?;

        Ok(PageContext {
            user_label: user.label().to_string(),
            is_admin,
            controls,
        })
    }
}

async fn seed_demo_users(store: &dyn RbacStore, catalog: &RoleCatalog) -> WebResult<()> {
    for (id, name, template) in DEMO_USERS {
        let user = User::new(*id, Some(name.to_string()));
        let result = match template {
            Some(template) => provision::provision_user(store, &user, catalog.get(template)?)
                .await
                .map(|_| ()),
            None => store.insert_user(&user).await,
        };

        match result {
            Ok(()) => info!(user = %id, "Seeded demo user"),
            Err(RbacError::DuplicateUser(_)) => debug!(user = %id, "Demo user already present"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
