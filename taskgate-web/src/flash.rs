//! One-shot flash messages
//!
//! A flash message rides in the `taskgate_flash` cookie across a redirect and
//! is cleared by the page that displays it.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::convert::Infallible;
use std::fmt;

/// Cookie carrying the pending flash message
pub const FLASH_COOKIE: &str = "taskgate_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Error,
    Success,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Error => "error",
            FlashLevel::Success => "success",
        }
    }
}

impl fmt::Display for FlashLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message for the next page the user sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    /// Cookie value, `<level>:<message>`
    pub fn encode(&self) -> String {
        format!("{}:{}", self.level, self.message)
    }

    pub fn decode(value: &str) -> Option<Self> {
        let (level, message) = value.split_once(':')?;
        let level = match level {
            "error" => FlashLevel::Error,
            "success" => FlashLevel::Success,
            _ => return None,
        };
        Some(Self {
            level,
            message: message.to_string(),
        })
    }

    pub fn from_jar(jar: &CookieJar) -> Option<Self> {
        jar.get(FLASH_COOKIE)
            .and_then(|cookie| Self::decode(cookie.value()))
    }

    pub fn to_cookie(&self) -> Cookie<'static> {
        Cookie::build((FLASH_COOKIE, self.encode()))
            .path("/")
            .http_only(true)
            .build()
    }

    /// Redirect (303) to `to`, setting this flash alongside `jar`'s changes
    pub fn redirect_with(self, jar: CookieJar, to: &str) -> Response {
        (jar.add(self.to_cookie()), Redirect::to(to)).into_response()
    }

    pub fn redirect(self, to: &str) -> Response {
        self.redirect_with(CookieJar::new(), to)
    }
}

/// Flash message left by the previous response, if any
#[derive(Debug, Clone)]
pub struct IncomingFlash {
    flash: Option<Flash>,
    jar: CookieJar,
}

impl IncomingFlash {
    pub fn peek(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }

    /// The message plus a jar that clears it once the response is sent
    pub fn take(self) -> (Option<Flash>, CookieJar) {
        let jar = match self.flash {
            Some(_) => self.jar.remove(Cookie::build(FLASH_COOKIE).path("/")),
            None => self.jar,
        };
        (self.flash, jar)
    }
}

impl<S> FromRequestParts<S> for IncomingFlash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let flash = Flash::from_jar(&jar);
        Ok(Self { flash, jar })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};

    fn replay_set_cookie(response: &Response) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in response.headers().get_all(header::SET_COOKIE) {
            headers.append(header::COOKIE, value.clone());
        }
        headers
    }

    #[test]
    fn test_decode_rejects_unknown_level() {
        assert_eq!(Flash::decode("warning:careful"), None);
        assert_eq!(Flash::decode("no separator"), None);
        assert_eq!(
            Flash::decode("error:a: b"),
            Some(Flash::error("a: b"))
        );
    }

    #[test]
    fn test_redirect_carries_message() {
        let message = "You do not have permission to perform this action.";
        let response = Flash::error(message).redirect("/tasks");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION),
            Some(&HeaderValue::from_static("/tasks"))
        );

        let jar = CookieJar::from_headers(&replay_set_cookie(&response));
        assert_eq!(Flash::from_jar(&jar), Some(Flash::error(message)));
    }

    #[tokio::test]
    async fn test_incoming_flash_is_cleared_on_take() {
        let response = Flash::success("Saved.").redirect("/");
        let mut request = Request::builder().uri("/").body(()).unwrap();
        *request.headers_mut() = replay_set_cookie(&response);
        let (mut parts, _) = request.into_parts();

        let incoming = IncomingFlash::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(incoming.peek(), Some(&Flash::success("Saved.")));

        let (flash, jar) = incoming.take();
        assert_eq!(flash, Some(Flash::success("Saved.")));

        let cleared = jar.into_response();
        let set_cookie = cleared
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(set_cookie.starts_with("taskgate_flash="));
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
