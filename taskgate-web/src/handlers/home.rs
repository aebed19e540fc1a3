//! Landing page

use crate::auth::CurrentUser;
use crate::flash::IncomingFlash;
use crate::templates::{render, HomeTemplate};
use crate::{AppState, WebResult};
use axum::{extract::State, response::Response};

/// Home page; also where role-gate denials land
pub async fn home(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: IncomingFlash,
) -> WebResult<Response> {
    let (flash, jar) = flash.take();
    let page = state.page_context(&user).await?;
    let role_name = state.resolver.role_of(user.id()).await?.map(|role| role.name);
    let permissions = state
        .resolver
        .permissions_of(user.id())
        .await?
        .into_iter()
        .map(|kind| kind.to_string())
        .collect();

    render(
        jar,
        HomeTemplate {
            title: "Taskgate".to_string(),
            flash,
            page,
            role_name,
            permissions,
            task_count: state.tasks.count().await,
        },
    )
}
