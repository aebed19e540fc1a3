//! Access gates
//!
//! A [`Gate`] guards a route with either a role requirement or a permission
//! requirement. Gates run after the login middleware and before the handler;
//! a denied request never reaches the handler and is answered with a 303
//! redirect carrying an error flash message:
//!
//! - role gates send the user to the home page with
//!   [`ROLE_DENIED_MESSAGE`]
//! - permission gates send the user back to the referring page (or home when
//!   there is none) with [`PERMISSION_DENIED_MESSAGE`]
//!
//! Gates fail closed: a request without an identity, or one whose check hits
//! a storage error, is denied.
//!
//! ```rust,ignore
//! use axum::{handler::Handler, routing::post, Router};
//! use taskgate_rbac::PermissionKind;
//! use taskgate_web::Gate;
//!
//! let update = Gate::permission(PermissionKind::Update).layer(resolver.clone());
//! let router = Router::new().route("/tasks/{id}", post(update_task.layer(update)));
//! ```

use crate::auth::CurrentUser;
use crate::flash::Flash;
use axum::{
    extract::Request,
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};
use taskgate_rbac::{PermissionKind, PermissionResolver, RbacError, UserId, ADMINISTRATOR_ROLE};
use tower::{Layer, Service};
use tracing::{debug, error, info, warn};

pub const ROLE_DENIED_MESSAGE: &str = "You do not have permission to access this page.";
pub const PERMISSION_DENIED_MESSAGE: &str = "You do not have permission to perform this action.";

/// Where role-gate denials land, and the fallback for permission denials
pub const HOME_ROUTE: &str = "/";

/// A route requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// The user's role must be named exactly this
    Role(String),
    /// The user's role must grant this kind
    Permission(PermissionKind),
}

impl Gate {
    pub fn role(name: impl Into<String>) -> Self {
        Gate::Role(name.into())
    }

    pub fn permission(kind: PermissionKind) -> Self {
        Gate::Permission(kind)
    }

    pub fn administrator() -> Self {
        Gate::role(ADMINISTRATOR_ROLE)
    }

    /// How a request refused by this gate is answered
    pub fn denial(&self) -> Denial {
        match self {
            Gate::Role(_) => Denial {
                target: RedirectTarget::Home,
                message: ROLE_DENIED_MESSAGE,
            },
            Gate::Permission(_) => Denial {
                target: RedirectTarget::Back,
                message: PERMISSION_DENIED_MESSAGE,
            },
        }
    }

    /// Check the requirement for `user`, who must already be authenticated
    pub async fn evaluate(&self, resolver: &PermissionResolver, user: Option<&UserId>) -> Verdict {
        let Some(user) = user else {
            warn!(gate = %self, "Gated route reached without an identity");
            return Verdict::Denied(self.denial());
        };

        let held = match self {
            Gate::Role(name) => resolver.has_role(user, name).await,
            Gate::Permission(kind) => resolver.has_permission(user, *kind).await,
        };

        match held {
            Ok(true) => {
                debug!(gate = %self, user = %user, "Access granted");
                Verdict::Allowed
            }
            Ok(false) => {
                info!(gate = %self, user = %user, "Access denied");
                Verdict::Denied(self.denial())
            }
            Err(e) => {
                error!(gate = %self, user = %user, error = %e, "Access check failed, denying");
                Verdict::Denied(self.denial())
            }
        }
    }

    pub fn layer(self, resolver: PermissionResolver) -> GateLayer {
        GateLayer::new(self, resolver)
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Role(name) => write!(f, "role:{}", name),
            Gate::Permission(kind) => write!(f, "permission:{}", kind),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateParseError {
    #[error("Gate '{0}' must look like role:<name> or permission:<kind>")]
    Malformed(String),

    #[error(transparent)]
    Permission(#[from] RbacError),
}

/// Parses `role:<name>` and `permission:<kind>`
impl FromStr for Gate {
    type Err = GateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("role", name)) if !name.is_empty() => Ok(Gate::role(name)),
            Some(("permission", kind)) => Ok(Gate::Permission(kind.parse()?)),
            _ => Err(GateParseError::Malformed(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Home,
    /// The referring page, when it is a path on this site
    Back,
}

/// A refused request's redirect and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub target: RedirectTarget,
    pub message: &'static str,
}

impl Denial {
    /// Resolve the redirect location against the request headers
    pub fn location(&self, headers: &HeaderMap) -> String {
        match self.target {
            RedirectTarget::Home => HOME_ROUTE.to_string(),
            RedirectTarget::Back => {
                referring_path(headers).unwrap_or_else(|| HOME_ROUTE.to_string())
            }
        }
    }

    pub fn respond(&self, headers: &HeaderMap) -> Response {
        Flash::error(self.message).redirect(&self.location(headers))
    }
}

/// Path and query of the Referer header. Only the path is kept so the
/// redirect never leaves this site.
fn referring_path(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let uri: Uri = referer.parse().ok()?;
    let path = uri.path_and_query()?.as_str();

    if path.starts_with('/') && !path.starts_with("//") {
        Some(path.to_string())
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(Denial),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }
}

/// Tower layer applying a [`Gate`] in front of a route
#[derive(Debug, Clone)]
pub struct GateLayer {
    gate: Gate,
    resolver: PermissionResolver,
}

impl GateLayer {
    pub fn new(gate: Gate, resolver: PermissionResolver) -> Self {
        Self { gate, resolver }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GateService {
            inner,
            gate: self.gate.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

/// Service produced by [`GateLayer`]
#[derive(Debug, Clone)]
pub struct GateService<S> {
    inner: S,
    gate: Gate,
    resolver: PermissionResolver,
}

impl<S> Service<Request> for GateService<S>
where
    S: Service<Request, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The clone may not be ready; keep the one that was polled
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = self.gate.clone();
        let resolver = self.resolver.clone();

        Box::pin(async move {
            let user = request
                .extensions()
                .get::<CurrentUser>()
                .map(|current| current.id().clone());

            match gate.evaluate(&resolver, user.as_ref()).await {
                Verdict::Allowed => {
                    let response = inner.call(request).await?;
                    Ok(response.into_response())
                }
                Verdict::Denied(denial) => Ok(denial.respond(request.headers())),
            }
        })
    }
}
