//! Server-side page templates (Askama)
//!
//! Every template extends `base.html`, which expects a `title` and an optional
//! `flash` message. Pages behind the login wall also carry a [`PageContext`]
//! whose [`ActionControls`](taskgate_rbac::ActionControls) decide which task
//! controls are rendered.

use crate::flash::Flash;
use crate::state::PageContext;
use crate::tasks::Task;
use crate::WebResult;
use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

/// Render `template` as HTML, applying `jar`'s cookie changes
pub fn render<T: Template>(jar: CookieJar, template: T) -> WebResult<Response> {
    let body = template.render()?;
    Ok((jar, Html(body)).into_response())
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub flash: Option<Flash>,
    /// Shown in development mode only
    pub known_users: Vec<String>,
}

impl LoginTemplate {
    pub fn new(flash: Option<Flash>, known_users: Vec<String>) -> Self {
        Self {
            title: "Log in - Taskgate".to_string(),
            flash,
            known_users,
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub title: String,
    pub flash: Option<Flash>,
    pub page: PageContext,
    pub role_name: Option<String>,
    pub permissions: Vec<String>,
    pub task_count: usize,
}

#[derive(Template)]
#[template(path = "tasks/index.html")]
pub struct TaskListTemplate {
    pub title: String,
    pub flash: Option<Flash>,
    pub page: PageContext,
    pub tasks: Vec<Task>,
}

impl TaskListTemplate {
    pub fn new(page: PageContext, flash: Option<Flash>, tasks: Vec<Task>) -> Self {
        Self {
            title: "Tasks - Taskgate".to_string(),
            flash,
            page,
            tasks,
        }
    }
}

/// Create form when `task` is `None`, edit form otherwise
#[derive(Template)]
#[template(path = "tasks/form.html")]
pub struct TaskFormTemplate {
    pub title: String,
    pub flash: Option<Flash>,
    pub page: PageContext,
    pub task: Option<Task>,
    pub action: String,
}

impl TaskFormTemplate {
    pub fn create(page: PageContext, flash: Option<Flash>) -> Self {
        Self {
            title: "New task - Taskgate".to_string(),
            flash,
            page,
            task: None,
            action: "/tasks".to_string(),
        }
    }

    pub fn edit(page: PageContext, flash: Option<Flash>, task: Task) -> Self {
        Self {
            title: format!("Edit {} - Taskgate", task.title),
            flash,
            page,
            action: format!("/tasks/{}", task.id),
            task: Some(task),
        }
    }
}

#[derive(Template)]
#[template(path = "tasks/show.html")]
pub struct TaskShowTemplate {
    pub title: String,
    pub flash: Option<Flash>,
    pub page: PageContext,
    pub task: Task,
}

impl TaskShowTemplate {
    pub fn new(page: PageContext, flash: Option<Flash>, task: Task) -> Self {
        Self {
            title: format!("{} - Taskgate", task.title),
            flash,
            page,
            task,
        }
    }
}

/// One line of the role management table
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub label: String,
    pub role: Option<String>,
    pub granted: Vec<String>,
    pub missing: Vec<String>,
}

impl UserRow {
    pub fn role_label(&self) -> &str {
        self.role.as_deref().unwrap_or("(no role)")
    }

    pub fn holds(&self, role_name: &str) -> bool {
        self.role.as_deref() == Some(role_name)
    }
}

#[derive(Template)]
#[template(path = "admin/roles.html")]
pub struct RolesTemplate {
    pub title: String,
    pub flash: Option<Flash>,
    pub page: PageContext,
    pub users: Vec<UserRow>,
    pub role_names: Vec<String>,
    pub default_role: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub flash: Option<Flash>,
    pub error_code: u16,
    pub error_message: String,
}

impl ErrorTemplate {
    pub fn new(error_code: u16, error_message: String) -> Self {
        Self {
            title: format!("Error {} - Taskgate", error_code),
            flash: None,
            error_code,
            error_message,
        }
    }
}
