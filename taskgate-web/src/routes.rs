//! Route table
//!
//! | Route                              | Gate                 |
//! |------------------------------------|----------------------|
//! | `GET /login`, `POST /login`        | public               |
//! | `GET /health`                      | public               |
//! | `GET /`, `POST /logout`            | login                |
//! | `GET /tasks`, `GET /tasks/{id}`    | permission:Retrieve  |
//! | `GET /tasks/new`, `POST /tasks`    | permission:Create    |
//! | `GET /tasks/{id}/edit`, `POST /tasks/{id}` | permission:Update |
//! | `POST /tasks/{id}/delete`          | permission:Delete    |
//! | `/admin/*`                         | role:Administrator   |

use crate::auth;
use crate::gate::{Gate, GateLayer};
use crate::handlers::{admin, health, home, tasks};
use crate::AppState;
use axum::{
    handler::Handler,
    middleware,
    routing::{get, post},
    Router,
};
use taskgate_rbac::PermissionKind;

/// Routes reachable without logging in
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/health", get(health::health_check))
}

/// Task pages, each guarded by its permission gate
pub fn task_routes(state: &AppState) -> Router<AppState> {
    let gate = |kind: PermissionKind| -> GateLayer {
        Gate::permission(kind).layer(state.resolver.clone())
    };
    let create = gate(PermissionKind::Create);
    let retrieve = gate(PermissionKind::Retrieve);
    let update = gate(PermissionKind::Update);
    let delete = gate(PermissionKind::Delete);

    Router::new()
        .route(
            "/tasks",
            get(tasks::list_tasks.layer(retrieve.clone()))
                .post(tasks::create_task.layer(create.clone())),
        )
        .route("/tasks/new", get(tasks::new_task.layer(create)))
        .route(
            "/tasks/{id}",
            get(tasks::show_task.layer(retrieve)).post(tasks::update_task.layer(update.clone())),
        )
        .route("/tasks/{id}/edit", get(tasks::edit_task.layer(update)))
        .route("/tasks/{id}/delete", post(tasks::delete_task.layer(delete)))
}

/// Role management, administrators only
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/roles", get(admin::roles_page))
        .route("/users", post(admin::provision_account))
        .route("/users/{id}/role", post(admin::assign_role))
        .route("/users/{id}/grant", post(admin::grant_permission))
        .route("/users/{id}/revoke", post(admin::revoke_permission))
        .route("/users/{id}/delete", post(admin::remove_account))
        .route_layer(Gate::administrator().layer(state.resolver.clone()))
}

/// Every route; the login check wraps the gates so gates always see an identity
pub fn app_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(home::home))
        .route("/logout", post(auth::logout))
        .merge(task_routes(state))
        .nest("/admin", admin_routes(state))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ));

    public_routes().merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use taskgate_core::TaskgateConfig;
    use taskgate_rbac::MemoryRbacStore;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check_route() {
        let state =
            AppState::with_store(TaskgateConfig::default(), Arc::new(MemoryRbacStore::new()))
                .await
                .unwrap();
        let app = public_routes().with_state(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_require_login() {
        let state =
            AppState::with_store(TaskgateConfig::default(), Arc::new(MemoryRbacStore::new()))
                .await
                .unwrap();
        let app = app_routes(&state).with_state(state);

        for uri in ["/", "/tasks", "/admin/roles"] {
            let response = app
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .uri(uri)
                        .body(axum::body::Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(
                response.headers().get(axum::http::header::LOCATION).unwrap(),
                "/login"
            );
        }
    }
}
