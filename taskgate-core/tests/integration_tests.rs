//! Integration tests for taskgate-core infrastructure

use taskgate_core::{config_error, LogFormat, TaskgateConfig, TaskgateError};

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskgate.toml");

    let mut config = TaskgateConfig::default();
    config.server.port = 9090;
    config.rbac.bootstrap_admin = Some("root".to_string());
    config.logging.format = LogFormat::Json;
    config.save_to_file(&path).unwrap();

    let loaded = TaskgateConfig::from_file(&path).unwrap();
    assert_eq!(loaded.server.port, 9090);
    assert_eq!(loaded.rbac.bootstrap_admin.as_deref(), Some("root"));
    assert_eq!(loaded.rbac.templates, config.rbac.templates);
    assert_eq!(loaded.logging.format, LogFormat::Json);
}

#[test]
fn test_missing_config_file_reports_context() {
    let err = TaskgateConfig::from_file("/definitely/not/here/taskgate.toml").unwrap_err();

    let context = err.context().expect("config errors carry context");
    assert_eq!(context.component, "config");
    assert_eq!(context.operation.as_deref(), Some("read_file"));
    assert!(!context.recovery_suggestions.is_empty());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = TaskgateConfig::from_toml_str("[server\nport = ").unwrap_err();
    assert!(matches!(err, TaskgateError::Config { .. }));

    // Logging the error must not panic
    err.log();
}

#[test]
fn test_config_error_macro() {
    let err = config_error!("bad value", "test");
    assert_eq!(err.to_string(), "Configuration error: bad value");
}

// Environment variables are process-wide, so every override case lives here
#[test]
fn test_env_overrides() {
    std::env::set_var("TASKGATE_HOST", "0.0.0.0");
    std::env::set_var("TASKGATE_PORT", "8181");
    std::env::set_var("DATABASE_URL", "sqlite://env.db?mode=rwc");

    let mut config = TaskgateConfig::default();
    config.apply_env_overrides();
    assert_eq!(config.address(), "0.0.0.0:8181");
    assert_eq!(config.database.url, "sqlite://env.db?mode=rwc");

    std::env::set_var("TASKGATE_PORT", "not-a-port");
    let mut config = TaskgateConfig::default();
    let default_port = config.server.port;
    config.apply_env_overrides();
    assert_eq!(config.server.port, default_port);
    assert_eq!(config.server.host, "0.0.0.0");

    std::env::remove_var("TASKGATE_HOST");
    std::env::remove_var("TASKGATE_PORT");
    std::env::remove_var("DATABASE_URL");

    let mut config = TaskgateConfig::default();
    config.apply_env_overrides();
    assert_eq!(config.address(), TaskgateConfig::default().address());
    assert_eq!(config.database.url, TaskgateConfig::default().database.url);
}
