//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether the access control store answered
    pub store: &'static str,
    pub users: Option<usize>,
    pub dev_mode: bool,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

/// Health check endpoint; 503 when the access control store is unreachable,
/// since every gated route would deny
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let users = match state.store().list_users().await {
        Ok(users) => Some(users.len()),
        Err(e) => {
            error!(error = %e, "Health check could not reach the access control store");
            None
        }
    };

    let (code, status, store) = match users {
        Some(_) => (StatusCode::OK, "healthy", "ok"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable"),
    };

    (
        code,
        Json(HealthResponse {
            status,
            store,
            users,
            dev_mode: state.config.server.dev_mode,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taskgate_core::TaskgateConfig;
    use taskgate_rbac::MemoryRbacStore;

    #[tokio::test]
    async fn test_health_counts_users() {
        let mut config = TaskgateConfig::default();
        config.rbac.bootstrap_admin = Some("root".to_string());
        let state = AppState::with_store(config, Arc::new(MemoryRbacStore::new()))
            .await
            .unwrap();

        let (code, Json(body)) = health_check(State(state)).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, "healthy");
        assert_eq!(body.users, Some(1));
        assert!(!body.dev_mode);
    }
}
