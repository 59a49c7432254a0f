use crate::{
    auth::{
        session::{Flash, FlashKind, Session},
        AuthError, DASHBOARD_PATH, LOGIN_PATH,
    },
    AppState, HtmlTemplate,
};
use askama::Template;
use axum::{
    extract::Form,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use serde::Deserialize;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    flashes: Vec<Flash>,
}

/// Login form content.
#[derive(Deserialize, Debug)]
pub struct LogIn {
    email: String,
    password: String,
}

/// Renders the login form with pending flashes.
pub async fn serve_login(Extension(session): Extension<Session>) -> impl IntoResponse {
    let template = LoginTemplate {
        flashes: session.take_flashes().await,
    };
    (StatusCode::OK, HtmlTemplate(template))
}

/// Signs the user in and sends them to the dashboard, or back to the form
/// with the reason.
pub async fn check_credentials(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    Form(log_in): Form<LogIn>,
) -> Response {
    match state
        .authenticator
        .authenticate(&log_in.email, &log_in.password)
        .await
    {
        Ok(user) => {
            tracing::info!("user {} signed in", user.id);
            session
                .establish(state.authenticator.serialize_identity(&user))
                .await;
            Redirect::to(DASHBOARD_PATH).into_response()
        }
        Err(e @ (AuthError::UnknownIdentifier | AuthError::BadSecret)) => {
            tracing::debug!("login rejected: {:?}", e);
            session.flash(FlashKind::Error, e.to_string()).await;
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e) => {
            tracing::error!("login failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error fetching info").into_response()
        }
    }
}

/// Ends the session and sends the user to the login page.
pub async fn logout(Extension(session): Extension<Session>) -> Redirect {
    if let Some(identity) = session.identity().await {
        tracing::info!("user {} signed out", identity);
    }
    session.end().await;
    session
        .flash(FlashKind::Success, "You've been successfully logged out.")
        .await;
    Redirect::to(LOGIN_PATH)
}
