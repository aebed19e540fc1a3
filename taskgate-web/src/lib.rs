//! Taskgate Web Server
//!
//! Server-rendered task list whose routes are guarded by role and permission
//! gates backed by `taskgate-rbac`.

pub mod auth;
pub mod flash;
pub mod gate;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod tasks;
pub mod templates;

// Re-export main types
pub use auth::CurrentUser;
pub use flash::{Flash, FlashLevel, IncomingFlash};
pub use gate::{Denial, Gate, GateLayer, GateService, Verdict};
pub use server::{TaskgateServer, TaskgateServerBuilder};
pub use state::AppState;
pub use tasks::{Task, TaskStore};

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Router,
};
use taskgate_core::TaskgateError;
use taskgate_rbac::RbacError;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    routes::app_routes(&state)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Access control error: {0}")]
    Rbac(#[from] RbacError),

    #[error("Configuration error: {0}")]
    Config(#[from] TaskgateError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Task {0} not found")]
    TaskNotFound(u64),
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        // Internal details stay in the log
        let message = match &self {
            WebError::TaskNotFound(_) => self.to_string(),
            _ => "Something went wrong while handling this request.".to_string(),
        };

        match templates::ErrorTemplate::new(status.as_u16(), message.clone()).render() {
            Ok(body) => (status, Html(body)).into_response(),
            Err(_) => (status, message).into_response(),
        }
    }
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;
