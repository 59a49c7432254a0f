use crate::{
    auth::{
        authenticator::SignUp,
        session::{Flash, FlashKind, Session},
        LOGIN_PATH, REGISTER_PATH,
    },
    AppState, HtmlTemplate,
};
use askama::Template;
use axum::{
    extract::Form,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Extension,
};

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    flashes: Vec<Flash>,
}

/// Renders the registration form.
pub async fn serve_register(Extension(session): Extension<Session>) -> impl IntoResponse {
    let template = RegisterTemplate {
        flashes: session.take_flashes().await,
    };
    (StatusCode::OK, HtmlTemplate(template))
}

/// Creates the account from the submitted form.
pub async fn register_user(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    Form(sign_up): Form<SignUp>,
) -> Redirect {
    match state.authenticator.register(&sign_up).await {
        Ok(user) => {
            tracing::info!("registered user {}", user.id);
            session
                .flash(
                    FlashKind::Success,
                    "Your registration was successful. Please sign in now.",
                )
                .await;
            Redirect::to(LOGIN_PATH)
        }
        Err(e) if e.is_user_facing() => {
            tracing::debug!("registration refused: {:?}", e);
            session.flash(FlashKind::Error, e.to_string()).await;
            Redirect::to(REGISTER_PATH)
        }
        Err(e) => {
            tracing::error!("registration failed: {e}");
            session
                .flash(FlashKind::Error, "Registration failed, please try again.")
                .await;
            Redirect::to(REGISTER_PATH)
        }
    }
}
