use crate::{
    auth::{Flash, FlashKind, Session, SessionIdentity, DASHBOARD_PATH},
    model::{NewProject, Project},
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
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    email: String,
    projects: Vec<Project>,
    flashes: Vec<Flash>,
}

#[derive(Deserialize, Debug)]
pub struct ProjectForm {
    title: String,
    #[serde(default)]
    content: String,
}

pub async fn serve_dashboard(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    Extension(SessionIdentity(user)): Extension<SessionIdentity>,
) -> Response {
    match state.projects.projects_for_user(user.id).await {
        Ok(projects) => {
            let template = DashboardTemplate {
                email: user.email,
                projects,
                flashes: session.take_flashes().await,
            };
            (StatusCode::OK, HtmlTemplate(template)).into_response()
        }
        Err(e) => {
            tracing::error!("cannot list projects of user {}: {e}", user.id);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal database error").into_response()
        }
    }
}

pub async fn create_project(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    Extension(SessionIdentity(user)): Extension<SessionIdentity>,
    Form(form): Form<ProjectForm>,
) -> Response {
    let project = match NewProject::new(&form.title, &form.content) {
        Some(project) => project,
        None => {
            session
                .flash(FlashKind::Error, "A project needs a title.")
                .await;
            return Redirect::to(DASHBOARD_PATH).into_response();
        }
    };
    match state.projects.create_project(user.id, project).await {
        Ok(project) => {
            tracing::debug!("user {} created project {:?}", user.id, project.id);
            session
                .flash(FlashKind::Success, format!("Created \"{}\".", project.title))
                .await;
            Redirect::to(DASHBOARD_PATH).into_response()
        }
        Err(e) => {
            tracing::error!("cannot create project for user {}: {e}", user.id);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal database error").into_response()
        }
    }
}
