//! Logging setup
//!
//! Structured logging through `tracing-subscriber` with configurable output format.

use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ErrorContext, TaskgateError, TaskgateResult};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Whether to include file and line information
    pub include_location: bool,
    /// Custom filter directives
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            filter_directives: vec![
                "taskgate_rbac=debug".to_string(),
                "taskgate_web=debug".to_string(),
                "tower_http=info".to_string(),
            ],
        }
    }
}

impl LoggingConfig {
    /// Build the env filter; `RUST_LOG` wins over the configured level
    pub fn env_filter(&self) -> TaskgateResult<EnvFilter> {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        for directive in &self.filter_directives {
            let parsed = directive.parse().map_err(|e| TaskgateError::Logging {
                message: format!("Invalid filter directive '{}': {}", directive, e),
                context: ErrorContext::new("logging").with_operation("parse_directive"),
            })?;
            filter = filter.add_directive(parsed);
        }

        Ok(filter)
    }
}

/// Initialize the global subscriber
pub fn init_logging(config: &LoggingConfig) -> TaskgateResult<()> {
    let registry = tracing_subscriber::registry().with(config.env_filter()?);

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_writer(io::stdout),
            )
            .try_init(),
    };

    result.map_err(|e| TaskgateError::Logging {
        message: format!("Failed to install subscriber: {}", e),
        context: ErrorContext::new("logging")
            .with_operation("init")
            .with_suggestion("Logging can only be initialized once per process"),
    })
}

/// Log the start of a named operation
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr) => {
        $crate::tracing::info!(operation = $operation, "Starting operation");
    };
    ($operation:expr, $($field:tt)*) => {
        $crate::tracing::info!(operation = $operation, $($field)*, "Starting operation");
    };
}

#[macro_export]
macro_rules! log_operation_success {
    ($operation:expr) => {
        $crate::tracing::info!(operation = $operation, "Operation completed successfully");
    };
    ($operation:expr, $($field:tt)*) => {
        $crate::tracing::info!(operation = $operation, $($field)*, "Operation completed successfully");
    };
}

#[macro_export]
macro_rules! log_operation_error {
    ($operation:expr, $error:expr) => {
        $crate::tracing::error!(operation = $operation, error = %$error, "Operation failed");
    };
    ($operation:expr, $error:expr, $($field:tt)*) => {
        $crate::tracing::error!(operation = $operation, error = %$error, $($field)*, "Operation failed");
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_directive_is_rejected() {
        let config = LoggingConfig {
            filter_directives: vec!["taskgate_web=notalevel".to_string()],
            ..LoggingConfig::default()
        };

        assert!(matches!(
            config.env_filter(),
            Err(TaskgateError::Logging { .. })
        ));
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let format: LogFormat = toml::from_str::<LoggingConfig>("format = \"json\"")
            .unwrap()
            .format;
        assert_eq!(format, LogFormat::Json);
    }
}
