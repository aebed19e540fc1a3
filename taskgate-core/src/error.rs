//! Unified error handling
//!
//! Structured error types carrying a context with an error id and recovery suggestions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub type TaskgateResult<T> = Result<T, TaskgateError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Infrastructure errors shared by the Taskgate crates
#[derive(Error, Debug)]
pub enum TaskgateError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Logging error: {message}")]
    Logging {
        message: String,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskgateError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            TaskgateError::Config { context, .. } => Some(context),
            TaskgateError::Validation { context, .. } => Some(context),
            TaskgateError::Logging { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Terminal report: the message, then the tracking id and recovery
    /// suggestions when the error carries a context
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        if let Some(context) = self.context() {
            out.push_str(&format!("\n  error id: {}", context.error_id));
            for suggestion in &context.recovery_suggestions {
                out.push_str(&format!("\n  hint: {}", suggestion));
            }
        }
        out
    }

    /// Log the error at error level with its tracking id
    pub fn log(&self) {
        error!(
            error_id = ?self.context().map(|c| &c.error_id),
            component = ?self.context().map(|c| &c.component),
            error = %self,
            "Error occurred"
        );
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::TaskgateError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::TaskgateError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}
