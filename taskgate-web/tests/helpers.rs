//! Integration test helpers
//!
//! Builds the full application router over a seeded store and drives it with
//! `tower::ServiceExt::oneshot`, so no socket is opened.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request},
    response::Response,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use http_body_util::BodyExt;
use std::sync::Arc;
use taskgate_core::TaskgateConfig;
use taskgate_rbac::{
    provision, MemoryRbacStore, PermissionKind, RbacStore, RoleTemplate, User,
};
use taskgate_web::{create_app, AppState, Flash};
use tower::ServiceExt;

/// Test application instance
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// Seeded identities:
/// - `root`: Administrator (bootstrap admin)
/// - `alice`: User with Create and Retrieve
/// - `editor`: Editor with Retrieve and Update
/// - `mallory`: role named `administrator` (wrong case) with Retrieve
/// - `nobody`: no role
pub async fn spawn_app() -> TestApp {
    let mut config = TaskgateConfig::default();
    config.rbac.bootstrap_admin = Some("root".to_string());
    spawn_app_with(config, Arc::new(MemoryRbacStore::new())).await
}

pub async fn spawn_app_with(config: TaskgateConfig, store: Arc<dyn RbacStore>) -> TestApp {
    use PermissionKind::*;

    let state = AppState::with_store(config, store).await.unwrap();
    let store = state.store().as_ref();

    let user = state.catalog.default_template().unwrap().clone();
    for (id, template) in [
        ("alice", user),
        ("editor", RoleTemplate::new("Editor", [Retrieve, Update])),
        ("mallory", RoleTemplate::new("administrator", [Retrieve])),
    ] {
        provision::provision_user(store, &User::new(id, None), &template)
            .await
            .unwrap();
    }
    store.insert_user(&User::new("nobody", None)).await.unwrap();

    TestApp {
        router: create_app(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        user: Option<&str>,
        referer: Option<&str>,
        form: &str,
    ) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        if let Some(referer) = referer {
            builder = builder.header(header::REFERER, referer);
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }

    /// GET `uri` sending back the cookies `previous` set
    pub async fn follow_with_cookies(
        &self,
        uri: &str,
        user: Option<&str>,
        previous: &Response,
    ) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        for value in previous.headers().get_all(header::SET_COOKIE) {
            builder = builder.header(header::COOKIE, value.clone());
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// The flash message a response leaves for the next page
pub fn flash(response: &Response) -> Option<Flash> {
    let mut headers = HeaderMap::new();
    for value in response.headers().get_all(header::SET_COOKIE) {
        headers.append(header::COOKIE, value.clone());
    }
    Flash::from_jar(&CookieJar::from_headers(&headers))
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
