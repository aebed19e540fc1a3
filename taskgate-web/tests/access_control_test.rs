//! End-to-end access control tests
//!
//! Every request goes through the full router: login middleware, gate, then
//! handler.

mod helpers;

use axum::http::StatusCode;
use helpers::{body_text, flash, location, set_cookies, spawn_app};
use taskgate_web::gate::{PERMISSION_DENIED_MESSAGE, ROLE_DENIED_MESSAGE};
use taskgate_web::Flash;

#[tokio::test]
async fn user_with_create_reaches_create_handler() {
    let app = spawn_app().await;

    let response = app
        .post_form("/tasks", Some("alice"), None, "title=Buy+milk")
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/tasks");
    assert_eq!(flash(&response), Some(Flash::success("Created \"Buy milk\".")));

    let tasks = app.state.tasks.list().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");
    assert_eq!(tasks[0].created_by, "alice");
}

#[tokio::test]
async fn missing_permission_redirects_back_without_running_handler() {
    let app = spawn_app().await;
    let task = app.state.tasks.create("Original", "root").await;

    let response = app
        .post_form(
            &format!("/tasks/{}", task.id),
            Some("alice"),
            Some("http://localhost:8080/tasks/1"),
            "title=Hijacked",
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/tasks/1");
    assert_eq!(flash(&response), Some(Flash::error(PERMISSION_DENIED_MESSAGE)));
    assert_eq!(app.state.tasks.get(task.id).await.unwrap().title, "Original");
}

#[tokio::test]
async fn missing_permission_without_referer_goes_home() {
    let app = spawn_app().await;
    let task = app.state.tasks.create("Keep me", "root").await;

    let response = app
        .post_form(&format!("/tasks/{}/delete", task.id), Some("alice"), None, "")
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(flash(&response), Some(Flash::error(PERMISSION_DENIED_MESSAGE)));
    assert!(app.state.tasks.get(task.id).await.is_some());
}

#[tokio::test]
async fn non_admin_on_admin_page_goes_home() {
    let app = spawn_app().await;

    for user in ["alice", "editor", "nobody"] {
        let response = app.get("/admin/roles", Some(user)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", user);
        assert_eq!(location(&response), "/");
        assert_eq!(flash(&response), Some(Flash::error(ROLE_DENIED_MESSAGE)));
    }
}

#[tokio::test]
async fn admin_role_name_is_case_sensitive() {
    let app = spawn_app().await;

    let response = app.get("/admin/roles", Some("mallory")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(flash(&response), Some(Flash::error(ROLE_DENIED_MESSAGE)));

    let response = app.get("/admin/roles", Some("root")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_without_role_is_denied_every_task_route() {
    let app = spawn_app().await;
    let task = app.state.tasks.create("Secret", "root").await;

    for uri in ["/tasks".to_string(), "/tasks/new".to_string(), format!("/tasks/{}", task.id)] {
        let response = app.get(&uri, Some("nobody")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(flash(&response), Some(Flash::error(PERMISSION_DENIED_MESSAGE)));
    }

    let response = app.post_form("/tasks", Some("nobody"), None, "title=x").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.state.tasks.count().await, 1);

    // The home page only needs a login
    let response = app.get("/", Some("nobody")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("not been assigned a role"));
}

#[tokio::test]
async fn custom_role_grants_exactly_its_permissions() {
    let app = spawn_app().await;
    let task = app.state.tasks.create("Draft", "root").await;

    let response = app.get(&format!("/tasks/{}/edit", task.id), Some("editor")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form(&format!("/tasks/{}", task.id), Some("editor"), None, "title=Final&done=on")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/tasks/{}", task.id));
    let updated = app.state.tasks.get(task.id).await.unwrap();
    assert_eq!(updated.title, "Final");
    assert!(updated.done);

    let response = app.get("/tasks/new", Some("editor")).await;
    assert_eq!(flash(&response), Some(Flash::error(PERMISSION_DENIED_MESSAGE)));
}

#[tokio::test]
async fn admin_reaches_every_route() {
    let app = spawn_app().await;
    let task = app.state.tasks.create("Review", "alice").await;

    for uri in [
        "/".to_string(),
        "/tasks".to_string(),
        "/tasks/new".to_string(),
        format!("/tasks/{}", task.id),
        format!("/tasks/{}/edit", task.id),
        "/admin/roles".to_string(),
    ] {
        let response = app.get(&uri, Some("root")).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    let response = app
        .post_form(&format!("/tasks/{}/delete", task.id), Some("root"), None, "")
        .await;
    assert_eq!(location(&response), "/tasks");
    assert_eq!(app.state.tasks.count().await, 0);
}

#[tokio::test]
async fn task_list_renders_only_permitted_controls() {
    let app = spawn_app().await;
    let task = app.state.tasks.create("Water plants", "root").await;
    let edit = format!("/tasks/{}/edit", task.id);
    let delete = format!("/tasks/{}/delete", task.id);

    let alice = body_text(app.get("/tasks", Some("alice")).await).await;
    assert!(alice.contains("Water plants"));
    assert!(alice.contains("/tasks/new"));
    assert!(!alice.contains(&edit));
    assert!(!alice.contains(&delete));
    assert!(!alice.contains("/admin/roles"));

    let editor = body_text(app.get("/tasks", Some("editor")).await).await;
    assert!(!editor.contains("/tasks/new"));
    assert!(editor.contains(&edit));
    assert!(!editor.contains(&delete));

    let root = body_text(app.get("/tasks", Some("root")).await).await;
    assert!(root.contains("/tasks/new"));
    assert!(root.contains(&edit));
    assert!(root.contains(&delete));
    assert!(root.contains("/admin/roles"));
}

#[tokio::test]
async fn denial_message_is_shown_once_on_the_next_page() {
    let app = spawn_app().await;

    let denied = app.get("/admin/roles", Some("alice")).await;
    let home = app.follow_with_cookies("/", Some("alice"), &denied).await;

    assert_eq!(home.status(), StatusCode::OK);
    assert!(set_cookies(&home)
        .iter()
        .any(|cookie| cookie.starts_with("taskgate_flash=") && cookie.contains("Max-Age=0")));
    assert!(body_text(home).await.contains(ROLE_DENIED_MESSAGE));
}

#[tokio::test]
async fn unknown_or_missing_identity_goes_to_login() {
    let app = spawn_app().await;

    for user in [None, Some("stranger")] {
        let response = app.get("/tasks", user).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }
}

#[tokio::test]
async fn missing_task_is_not_found() {
    let app = spawn_app().await;

    let response = app.get("/tasks/99", Some("root")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let app = spawn_app().await;

    let response = app.post_form("/tasks", Some("alice"), None, "title=+++").await;
    assert_eq!(location(&response), "/tasks/new");
    assert_eq!(flash(&response), Some(Flash::error("A task needs a title.")));
    assert_eq!(app.state.tasks.count().await, 0);
}

#[tokio::test]
async fn login_sets_identity_cookie() {
    let app = spawn_app().await;

    let response = app.post_form("/login", None, None, "user_id=alice").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(set_cookies(&response)
        .iter()
        .any(|cookie| cookie.starts_with("taskgate_user=alice")));

    let home = app.follow_with_cookies("/", None, &response).await;
    assert_eq!(home.status(), StatusCode::OK);
    assert!(body_text(home).await.contains("Welcome, alice"));

    let response = app.post_form("/login", None, None, "user_id=stranger").await;
    assert_eq!(location(&response), "/login");
    assert_eq!(flash(&response), Some(Flash::error("No user named 'stranger'.")));
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("healthy"));
}
