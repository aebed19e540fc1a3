//! Taskgate Web Server
//!
//! Task list with role and permission gates.

use clap::Parser;
use std::path::PathBuf;
use taskgate_core::{init_logging, TaskgateConfig};
use taskgate_web::{TaskgateServerBuilder, WebError};
use tracing::{error, info};

/// Taskgate Web Server - task list guarded by roles and permissions
#[derive(Parser)]
#[command(name = "taskgate-web")]
#[command(about = "A task list web app with role-based access control")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode (seeds demo users)
    #[arg(long)]
    dev: bool,

    /// Database URL for users, roles and permissions
    #[arg(long)]
    database_url: Option<String>,

    /// User provisioned as administrator on start
    #[arg(long)]
    admin: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> taskgate_core::TaskgateResult<TaskgateConfig> {
    let mut config = match &args.config {
        Some(path) => TaskgateConfig::from_file(path)?,
        None => TaskgateConfig::default(),
    };
    config.apply_env_overrides();

    // Command line wins over file and environment
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.dev {
        config.server.dev_mode = true;
    }
    if let Some(url) = &args.database_url {
        config.database.url = url.clone();
    }
    if let Some(admin) = &args.admin {
        config.rbac.bootstrap_admin = Some(admin.clone());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e.report());
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e.report());
        std::process::exit(1);
    }

    info!(address = %config.address(), database = %config.database.url, "Configuration loaded");

    let server = match TaskgateServerBuilder::with_config(config).build().await {
        Ok(server) => server,
        Err(WebError::Config(e)) => {
            e.log();
            eprintln!("Failed to build server: {}", e.report());
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
