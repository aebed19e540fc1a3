//! Login collaborator
//!
//! Establishes who is making the request. The identity is a user id carried in
//! the `taskgate_user` cookie, or the `x-user-id` header for scripted clients.
//! There are no passwords here: any id present in the store may log in. The
//! access gates only ever see identities this module has already checked.

use crate::flash::{Flash, IncomingFlash};
use crate::templates::{render, LoginTemplate};
use crate::{AppState, WebResult};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use taskgate_rbac::{User, UserId};
use tracing::{error, info, warn};

/// Cookie holding the logged-in user id
pub const IDENTITY_COOKIE: &str = "taskgate_user";

/// Header accepted in place of the identity cookie
pub const IDENTITY_HEADER: &str = "x-user-id";

pub const LOGIN_ROUTE: &str = "/login";

/// The authenticated user for this request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
}

impl CurrentUser {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn id(&self) -> &UserId {
        &self.user.id
    }

    pub fn label(&self) -> &str {
        self.user.label()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| Redirect::to(LOGIN_ROUTE))
    }
}

/// Claimed identity: the header wins over the cookie
pub fn claimed_identity(headers: &HeaderMap, jar: &CookieJar) -> Option<UserId> {
    let from_header = headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(UserId::from);

    from_header.or_else(|| {
        jar.get(IDENTITY_COOKIE)
            .map(|cookie| cookie.value().trim())
            .filter(|id| !id.is_empty())
            .map(UserId::from)
    })
}

fn identity_cookie(user_id: &UserId) -> Cookie<'static> {
    Cookie::build((IDENTITY_COOKIE, user_id.to_string()))
        .path("/")
        .http_only(true)
        .build()
}

fn forget_identity(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(IDENTITY_COOKIE).path("/"))
}

/// Middleware for every route behind the login wall
///
/// Attaches [`CurrentUser`] to the request, or redirects to the login page
/// when the claimed identity is missing or unknown to the store.
pub async fn require_login(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = claimed_identity(request.headers(), &jar) else {
        return Flash::error("Please log in to continue.").redirect(LOGIN_ROUTE);
    };

    match state.store().get_user(&user_id).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(CurrentUser::new(user));
            next.run(request).await
        }
        Ok(None) => {
            warn!(user = %user_id, "Unknown identity presented");
            Flash::error("Your account could not be found. Please log in again.")
                .redirect_with(forget_identity(jar), LOGIN_ROUTE)
        }
        Err(e) => {
            error!(user = %user_id, error = %e, "Failed to load user for login check");
            Flash::error("We could not verify your login. Please try again.")
                .redirect(LOGIN_ROUTE)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub user_id: String,
}

/// Login page
pub async fn login_page(
    State(state): State<AppState>,
    flash: IncomingFlash,
) -> WebResult<Response> {
    let (flash, jar) = flash.take();

    // Dev mode lists the known identities to make trying the roles out easy
    let known_users = if state.config.server.dev_mode {
        state
            .store()
            .list_users()
            .await?
            .into_iter()
            .map(|user| user.id.to_string())
            .collect()
    } else {
        Vec::new()
    };

    render(jar, LoginTemplate::new(flash, known_users))
}

/// Log in as an existing user
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> WebResult<Response> {
    let user_id = form.user_id.trim();
    if user_id.is_empty() {
        return Ok(Flash::error("Enter a user id to log in.").redirect(LOGIN_ROUTE));
    }

    let user_id = UserId::from(user_id);
    match state.store().get_user(&user_id).await? {
        Some(user) => {
            info!(user = %user.id, "User logged in");
            let jar = jar.add(identity_cookie(&user.id));
            Ok(Flash::success(format!("Welcome, {}.", user.label())).redirect_with(jar, "/"))
        }
        None => {
            warn!(user = %user_id, "Login attempt for unknown user");
            Ok(Flash::error(format!("No user named '{}'.", user_id)).redirect(LOGIN_ROUTE))
        }
    }
}

pub async fn logout(user: CurrentUser, jar: CookieJar) -> Response {
    info!(user = %user.id(), "User logged out");
    Flash::success("You have been logged out.").redirect_with(forget_identity(jar), LOGIN_ROUTE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_identity_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(IDENTITY_HEADER, HeaderValue::from_static("alice"));
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("taskgate_user=bob"),
        );
        let jar = CookieJar::from_headers(&headers);

        assert_eq!(claimed_identity(&headers, &jar), Some(UserId::from("alice")));
    }

    #[test]
    fn test_blank_identity_is_no_identity() {
        let mut headers = HeaderMap::new();
        headers.insert(IDENTITY_HEADER, HeaderValue::from_static("  "));
        let jar = CookieJar::from_headers(&headers);

        assert_eq!(claimed_identity(&headers, &jar), None);

        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("taskgate_user=carol"),
        );
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(claimed_identity(&headers, &jar), Some(UserId::from("carol")));
    }
}
