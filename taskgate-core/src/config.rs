//! Configuration management
//!
//! `TaskgateConfig` is read from TOML; a few environment variables override it.

use crate::error::{ErrorContext, TaskgateError, TaskgateResult};
use crate::logging::LoggingConfig;
use crate::validation_error;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Permission kind names accepted in role templates
pub const PERMISSION_KIND_NAMES: [&str; 4] = ["Create", "Retrieve", "Update", "Delete"];

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskgateConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rbac: RbacConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Development mode seeds demo users on startup
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://taskgate.db` or `sqlite::memory:`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }
}

/// A named permission set applied when provisioning or re-assigning a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTemplateConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Permission kind names, e.g. `["Create", "Retrieve"]`
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Role and permission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Template used for users provisioned without an explicit role
    pub default_role: String,
    /// User id provisioned as administrator at startup, if any
    pub bootstrap_admin: Option<String>,
    pub templates: Vec<RoleTemplateConfig>,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            default_role: "User".to_string(),
            bootstrap_admin: Some("admin".to_string()),
            templates: vec![
                RoleTemplateConfig {
                    name: "Administrator".to_string(),
                    description: Some("Full access to tasks and role management".to_string()),
                    permissions: PERMISSION_KIND_NAMES.iter().map(|p| p.to_string()).collect(),
                },
                RoleTemplateConfig {
                    name: "User".to_string(),
                    description: Some("Can add and view tasks".to_string()),
                    permissions: vec!["Create".to_string(), "Retrieve".to_string()],
                },
            ],
        }
    }
}

impl TaskgateConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TaskgateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TaskgateError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> TaskgateResult<Self> {
        toml::from_str(content).map_err(|e| TaskgateError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> TaskgateResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| TaskgateError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `TASKGATE_HOST`, `TASKGATE_PORT` and `DATABASE_URL` overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("TASKGATE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("TASKGATE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> TaskgateResult<()> {
        if self.server.port == 0 {
            return Err(validation_error!(
                "Server port must be greater than 0",
                "server.port",
                "config"
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(validation_error!(
                "Database URL must not be empty",
                "database.url",
                "config"
            ));
        }

        let mut names = HashSet::new();
        for template in &self.rbac.templates {
            if template.name.trim().is_empty() {
                return Err(validation_error!(
                    "Role template name must not be empty",
                    "rbac.templates.name",
                    "config"
                ));
            }
            if !names.insert(template.name.as_str()) {
                return Err(validation_error!(
                    format!("Duplicate role template '{}'", template.name),
                    "rbac.templates.name",
                    "config"
                ));
            }
            if let Some(unknown) = template
                .permissions
                .iter()
                .find(|name| !PERMISSION_KIND_NAMES.contains(&name.as_str()))
            {
                return Err(validation_error!(
                    format!(
                        "Role template '{}' grants unknown permission '{}' (expected one of {})",
                        template.name,
                        unknown,
                        PERMISSION_KIND_NAMES.join(", ")
                    ),
                    "rbac.templates.permissions",
                    "config"
                ));
            }
        }

        if !names.contains(self.rbac.default_role.as_str()) {
            return Err(validation_error!(
                format!(
                    "Default role '{}' has no matching template",
                    self.rbac.default_role
                ),
                "rbac.default_role",
                "config"
            ));
        }

        Ok(())
    }
}
