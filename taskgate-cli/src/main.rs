//! Taskgate CLI - administer users, roles and permissions
//!
//! Works directly against the access control database the web server uses.

mod commands;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use commands::{Context, Requirement};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use taskgate_core::{init_logging, log_operation_error, TaskgateConfig, TaskgateError};
use taskgate_rbac::{PermissionKind, RoleCatalog, SqliteRbacStore};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "taskgate")]
#[command(about = "Manage Taskgate users, roles and permissions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL (overrides config and DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage role assignments
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },

    /// Grant a permission kind to a user's role
    Grant {
        user: String,
        /// Create, Retrieve, Update or Delete
        kind: String,
    },

    /// Revoke a permission kind from a user's role
    Revoke { user: String, kind: String },

    /// Check a user against a role or permission; exits 1 when denied
    Check {
        user: String,

        #[arg(long, conflicts_with = "permission", required_unless_present = "permission")]
        role: Option<String>,

        #[arg(long)]
        permission: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Add a user with a role from the configured templates
    Add {
        id: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Role template (defaults to the configured default role)
        #[arg(long, conflicts_with = "no_role")]
        role: Option<String>,

        /// Add the user without any role
        #[arg(long)]
        no_role: bool,
    },
    /// Remove a user together with their role and grants
    Remove { id: String },
    /// List users and their roles
    List,
}

#[derive(Subcommand)]
enum RoleAction {
    /// Move a user to a role template
    Assign { user: String, template: String },
    /// Show a user's role and permissions
    Show { user: String },
    /// List the configured role templates
    Templates,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Where to write it (defaults to the user config directory)
        path: Option<PathBuf>,
    },
    /// Print the effective configuration
    Show,
    /// Validate the effective configuration
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log_operation_error!("cli", e);
            match e.downcast_ref::<TaskgateError>() {
                Some(config_error) => eprintln!("Error: {}", config_error.report()),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = load_config(cli.config.as_ref())?;
    config.apply_env_overrides();
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    config.logging.level = if cli.verbose { "debug" } else { "warn" }.to_string();
    init_logging(&config.logging)?;

    if let Commands::Config { action } = &cli.command {
        return handle_config(action, &config).map(|_| ExitCode::SUCCESS);
    }

    config.validate()?;
    if config.database.url.contains(":memory:") {
        warn!("Using an in-memory database; changes will not persist");
    }

    let store = SqliteRbacStore::connect(&config.database.url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    let catalog = RoleCatalog::from_config(&config.rbac)?;
    let ctx = Context::new(Arc::new(store), catalog);

    let output = match cli.command {
        Commands::User { action } => match action {
            UserAction::Add {
                id,
                name,
                role,
                no_role,
            } => commands::user_add(&ctx, &id, name, role.as_deref(), no_role).await?,
            UserAction::Remove { id } => commands::user_remove(&ctx, &id).await?,
            UserAction::List => commands::user_list(&ctx).await?,
        },
        Commands::Role { action } => match action {
            RoleAction::Assign { user, template } => {
                commands::role_assign(&ctx, &user, &template).await?
            }
            RoleAction::Show { user } => commands::role_show(&ctx, &user).await?,
            RoleAction::Templates => commands::role_templates(&ctx)?,
        },
        Commands::Grant { user, kind } => commands::grant(&ctx, &user, &kind).await?,
        Commands::Revoke { user, kind } => commands::revoke(&ctx, &user, &kind).await?,
        Commands::Check {
            user,
            role,
            permission,
        } => {
            let requirement = match (role, permission) {
                (Some(role), _) => Requirement::Role(role),
                (None, Some(kind)) => Requirement::Permission(kind.parse::<PermissionKind>()?),
                (None, None) => anyhow::bail!("Pass --role or --permission"),
            };

            let allowed = commands::check(&ctx, &user, &requirement).await?;
            println!("{}", if allowed { "allowed" } else { "denied" });
            return Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            });
        }
        Commands::Config { action } => {
            handle_config(&action, &config)?;
            String::new()
        }
    };

    print!("{}", output);
    if !output.is_empty() && !output.ends_with('\n') {
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

fn default_config_paths() -> Vec<PathBuf> {
    [
        dirs::config_dir().map(|d| d.join("taskgate").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".taskgate").join("config.toml")),
        Some(PathBuf::from("taskgate.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn load_config(config_path: Option<&PathBuf>) -> Result<TaskgateConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return Ok(TaskgateConfig::from_file(path)?);
    }

    for path in default_config_paths() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return Ok(TaskgateConfig::from_file(&path)?);
        }
    }

    Ok(TaskgateConfig::default())
}

fn handle_config(action: &ConfigAction, config: &TaskgateConfig) -> Result<()> {
    match action {
        ConfigAction::Init { path } => {
            let path = match path {
                Some(path) => path.clone(),
                None => dirs::config_dir()
                    .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
                    .context("No configuration directory available; pass a path")?
                    .join("taskgate")
                    .join("config.toml"),
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            TaskgateConfig::default().save_to_file(&path)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Validate => {
            config.validate()?;
            println!("Configuration is valid");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_init_writes_valid_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("taskgate.toml");

        let init = ConfigAction::Init {
            path: Some(path.clone()),
        };
        handle_config(&init, &TaskgateConfig::default()).unwrap();

        let written = load_config(Some(&path)).unwrap();
        assert!(written.validate().is_ok());
        assert_eq!(written.rbac.default_role, "User");
    }

    #[test]
    fn test_config_validate_rejects_unknown_permission() {
        let mut config = TaskgateConfig::default();
        config.rbac.templates[0].permissions.push("Archive".to_string());

        let err = handle_config(&ConfigAction::Validate, &config).unwrap_err();
        let config_error = err.downcast_ref::<TaskgateError>().unwrap();
        assert!(config_error.report().contains("unknown permission 'Archive'"));
    }
}
