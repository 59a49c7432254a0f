#![deny(missing_docs)]

//! This crate contains the server of a small session-authenticated web app:
//! registration, login and logout against a user store, plus a per-user
//! project list.

/// Module containing all the authentication, registration, cookies, etc. logic.
pub mod auth;
/// Records persisted by the stores.
pub mod model;
/// This module is used to parse and read from configuration files for the
/// server.
pub mod settings;
pub mod store;
mod app;
mod dashboard;
mod users;

pub use app::{app, init_tracing, run_server};
pub use users::{create_user, delete_user};

use askama::Template;
use auth::{Authenticator, SessionCarrier, SessionError};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use settings::Settings;
use std::fmt::Display;
use std::sync::Arc;
use store::{ProjectStore, Stores};

/// Everything the handlers share, handed to them as an extension.
#[derive(Clone)]
pub struct AppState {
    /// Credential checks and identity (de)serialization.
    pub authenticator: Authenticator,
    /// Project persistence.
    pub projects: Arc<dyn ProjectStore>,
    /// Session table behind the cookies.
    pub sessions: SessionCarrier,
}

impl AppState {
    /// Wires the stores and the session table together from the settings.
    pub fn new(stores: Stores, settings: &Settings) -> Result<AppState, SessionError> {
        Ok(AppState {
            authenticator: Authenticator::new(stores.users, settings.auth.password_scheme),
            projects: stores.projects,
            sessions: SessionCarrier::new(&settings.session)?,
        })
    }
}

/// This function is a fallback to handle errors and return responses that is
/// used in several place in the code.
pub async fn handle_static_error<T: Display>(error: T) -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        HeaderMap::new(),
        format!("Unhandled internal error: {}", error),
    )
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template. Error: {}", err),
            )
                .into_response(),
        }
    }
}
