use crate::auth::{SessionIdentity, DASHBOARD_PATH, LOGIN_PATH};
use axum::{
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

/// Which visitors a route admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Only signed in users may pass.
    Authenticated,
    /// Only visitors without a session identity may pass.
    Anonymous,
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Let the request through.
    Pass,
    /// Send the visitor to this path instead.
    Redirect(&'static str),
}

/// Decides whether a request carrying `identity` gets through `guard`.
pub fn check_access(guard: Guard, identity: Option<&SessionIdentity>) -> Access {
    match (guard, identity) {
        (Guard::Authenticated, Some(_)) | (Guard::Anonymous, None) => Access::Pass,
        (Guard::Authenticated, None) => Access::Redirect(LOGIN_PATH),
        (Guard::Anonymous, Some(_)) => Access::Redirect(DASHBOARD_PATH),
    }
}

async fn enforce<B>(guard: Guard, req: Request<B>, next: Next<B>) -> Response {
    let access = check_access(guard, req.extensions().get::<SessionIdentity>());
    match access {
        Access::Pass => next.run(req).await,
        Access::Redirect(to) => {
            tracing::debug!("{:?} guard redirects {} to {}", guard, req.uri(), to);
            Redirect::to(to).into_response()
        }
    }
}

/// Middleware redirecting anonymous visitors to the login page.
pub async fn require_authenticated<B>(req: Request<B>, next: Next<B>) -> Response {
    enforce(Guard::Authenticated, req, next).await
}

/// Middleware redirecting signed in users to their dashboard.
pub async fn require_anonymous<B>(req: Request<B>, next: Next<B>) -> Response {
    enforce(Guard::Anonymous, req, next).await
}
