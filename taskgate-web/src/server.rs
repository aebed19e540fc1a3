//! Taskgate Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebError, WebResult};
use axum::serve;
use taskgate_core::TaskgateConfig;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main Taskgate web server
pub struct TaskgateServer {
    config: TaskgateConfig,
    state: AppState,
}

impl TaskgateServer {
    /// Create a new server backed by the configured database
    pub async fn new(config: TaskgateConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;

        Ok(Self { config, state })
    }

    /// Start the web server and run until Ctrl-C
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting Taskgate web server");
        info!("Server address: http://{}", address);
        info!("Development mode: {}", self.config.server.dev_mode);

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server stopped");
        Ok(())
    }

    pub fn config(&self) -> &TaskgateConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Builder for TaskgateServer
pub struct TaskgateServerBuilder {
    config: TaskgateConfig,
}

impl TaskgateServerBuilder {
    pub fn new() -> Self {
        Self {
            config: TaskgateConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn with_config(config: TaskgateConfig) -> Self {
        Self { config }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Enable development mode (seeds demo users)
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.server.dev_mode = dev_mode;
        self
    }

    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.database.url = database_url.into();
        self
    }

    /// Set the user provisioned as administrator on start
    pub fn bootstrap_admin<S: Into<String>>(mut self, user_id: S) -> Self {
        self.config.rbac.bootstrap_admin = Some(user_id.into());
        self
    }

    pub async fn build(self) -> WebResult<TaskgateServer> {
        TaskgateServer::new(self.config).await
    }
}

impl Default for TaskgateServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
