//! Task pages
//!
//! Route gates: listing and viewing need Retrieve, the new-task form and
//! submission need Create, the edit form and submission need Update, and
//! deletion needs Delete.

use crate::auth::CurrentUser;
use crate::flash::{Flash, IncomingFlash};
use crate::templates::{render, TaskFormTemplate, TaskListTemplate, TaskShowTemplate};
use crate::{AppState, WebError, WebResult};
use axum::{
    extract::{Path, State},
    response::Response,
    Form,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct TaskForm {
    pub title: String,
    /// Checkbox; present only when ticked
    #[serde(default)]
    pub done: Option<String>,
}

impl TaskForm {
    fn title(&self) -> Option<&str> {
        Some(self.title.trim()).filter(|title| !title.is_empty())
    }
}

pub async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: IncomingFlash,
) -> WebResult<Response> {
    let (flash, jar) = flash.take();
    let page = state.page_context(&user).await?;
    let tasks = state.tasks.list().await;

    render(jar, TaskListTemplate::new(page, flash, tasks))
}

pub async fn new_task(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: IncomingFlash,
) -> WebResult<Response> {
    let (flash, jar) = flash.take();
    let page = state.page_context(&user).await?;

    render(jar, TaskFormTemplate::create(page, flash))
}

pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<TaskForm>,
) -> WebResult<Response> {
    let Some(title) = form.title() else {
        return Ok(Flash::error("A task needs a title.").redirect("/tasks/new"));
    };

    let task = state.tasks.create(title, user.id().as_str()).await;
    info!(task = task.id, user = %user.id(), "Task created");

    Ok(Flash::success(format!("Created \"{}\".", task.title)).redirect("/tasks"))
}

pub async fn show_task(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: IncomingFlash,
    Path(id): Path<u64>,
) -> WebResult<Response> {
    let task = state.tasks.get(id).await.ok_or(WebError::TaskNotFound(id))?;
    let (flash, jar) = flash.take();
    let page = state.page_context(&user).await?;

    render(jar, TaskShowTemplate::new(page, flash, task))
}

pub async fn edit_task(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: IncomingFlash,
    Path(id): Path<u64>,
) -> WebResult<Response> {
    let task = state.tasks.get(id).await.ok_or(WebError::TaskNotFound(id))?;
    let (flash, jar) = flash.take();
    let page = state.page_context(&user).await?;

    render(jar, TaskFormTemplate::edit(page, flash, task))
}

pub async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Form(form): Form<TaskForm>,
) -> WebResult<Response> {
    let Some(title) = form.title() else {
        return Ok(Flash::error("A task needs a title.").redirect(&format!("/tasks/{}/edit", id)));
    };

    let task = state
        .tasks
        .update(id, title, form.done.is_some())
        .await
        .ok_or(WebError::TaskNotFound(id))?;
    info!(task = task.id, user = %user.id(), done = task.done, "Task updated");

    Ok(Flash::success("Task saved.").redirect(&format!("/tasks/{}", id)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> WebResult<Response> {
    if !state.tasks.delete(id).await {
        return Err(WebError::TaskNotFound(id));
    }
    info!(task = id, user = %user.id(), "Task deleted");

    Ok(Flash::success("Task deleted.").redirect("/tasks"))
}
