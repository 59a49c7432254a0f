use crate::auth::{
    check_credentials, logout, register_user, require_anonymous, require_authenticated,
    serve_login, serve_register, session_middleware, DASHBOARD_PATH,
};
use crate::dashboard::{create_project, serve_dashboard};
use crate::settings::Settings;
use crate::{handle_static_error, store, AppState};
use axum::{
    middleware,
    response::Redirect,
    routing::{get, get_service, post},
    Extension, Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Installs the global tracing subscriber. `RUST_LOG` wins over the
/// configured filter.
pub fn init_tracing(settings: &Settings) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| settings.base.rust_log.clone())
        .unwrap_or_else(|| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Runs the server. Main entrypoint for the server app.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let stores = store::connect(&settings.database).await?;
    let state = AppState::new(stores, &settings)?;

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let pruned = sessions.prune_expired().await;
            if pruned > 0 {
                tracing::debug!("pruned {} expired sessions", pruned);
            }
        }
    });

    let addr: SocketAddr = settings.base.address.parse()?;
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app(state, &settings).into_make_service())
        .await?;
    Ok(())
}

/// Builds the router with every route, guard and layer in place.
pub fn app(state: AppState, settings: &Settings) -> Router {
    let anonymous_routes = Router::new()
        .route("/login", get(serve_login).post(check_credentials))
        .route("/register", get(serve_register).post(register_user))
        .route_layer(middleware::from_fn(require_anonymous));

    let authenticated_routes = Router::new()
        .route("/", get(|| async { Redirect::to(DASHBOARD_PATH) }))
        .route("/dashboard", get(serve_dashboard))
        .route("/projects", post(create_project))
        .route("/logout", get(logout))
        .route_layer(middleware::from_fn(require_authenticated));

    let session_state = state.clone();
    Router::new()
        .merge(anonymous_routes)
        .merge(authenticated_routes)
        .fallback(
            get_service(ServeDir::new(&settings.base.static_dir)).handle_error(handle_static_error),
        )
        .layer(middleware::from_fn(move |req, next| {
            session_middleware(req, next, session_state.clone())
        }))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Auth, Backend, BaseSettings, Database, Session};
    use crate::store::Stores;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    fn test_settings() -> Settings {
        Settings {
            database: Database {
                backend: Backend::Memory,
                url: String::new(),
                max_connections: 1,
            },
            session: Session {
                secret: "keyboard cat".to_string(),
                max_age_secs: 3600,
                cookie_name: "gate.sid".to_string(),
                secure: false,
            },
            auth: Auth::default(),
            base: BaseSettings {
                address: "127.0.0.1:0".to_string(),
                rust_log: None,
                static_dir: "./does-not-exist".to_string(),
            },
        }
    }

    fn test_app() -> (Router, AppState) {
        let settings = test_settings();
        let state = AppState::new(Stores::memory(), &settings).unwrap();
        (app(state.clone(), &settings), state)
    }

    async fn get_page(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut req = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_form(app: &Router, uri: &str, form: &str, cookie: Option<&str>) -> Response {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(req.body(Body::from(form.to_string())).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    /// The `name=value` pair set by the response, if any.
    fn set_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .map(|value| value.to_str().unwrap().split(';').next().unwrap().to_string())
    }

    async fn body_text(response: Response) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn register(app: &Router, email: &str, password: &str) -> Response {
        let form = format!(
            "email={}&password={}&repeat_password={}",
            email.replace('@', "%40"),
            password,
            password
        );
        post_form(app, "/register", &form, None).await
    }

    async fn login(app: &Router, email: &str, password: &str) -> Response {
        let form = format!("email={}&password={}", email.replace('@', "%40"), password);
        post_form(app, "/login", &form, None).await
    }

    #[tokio::test]
    async fn anonymous_visitors_are_sent_to_login() {
        let (app, _) = test_app();
        for uri in ["/", "/dashboard", "/logout"] {
            let response = get_page(&app, uri, None).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/login");
            assert!(set_cookie(&response).is_none());
        }
    }

    #[tokio::test]
    async fn login_and_register_pages_render_for_anonymous_visitors() {
        let (app, _) = test_app();
        let response = get_page(&app, "/login", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("name=\"password\""));

        let response = get_page(&app, "/register", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("name=\"repeat_password\""));
    }

    #[tokio::test]
    async fn registration_leads_to_login_with_a_flash() {
        let (app, _) = test_app();
        let response = register(&app, "user@test.com", "hunters2").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        let cookie = set_cookie(&response).unwrap();

        let response = get_page(&app, "/login", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(set_cookie(&response).as_deref(), Some("gate.sid="));
        assert!(body_text(response)
            .await
            .contains("Your registration was successful. Please sign in now."));
    }

    #[tokio::test]
    async fn registration_failures_return_to_the_form() {
        let (app, _) = test_app();
        register(&app, "user@test.com", "hunters2").await;

        let response = register(&app, "user@test.com", "hunters2").await;
        assert_eq!(location(&response), "/register");
        let cookie = set_cookie(&response).unwrap();
        let page = body_text(get_page(&app, "/register", Some(&cookie)).await).await;
        assert!(page.contains("This email address is already registered."));

        let response = post_form(
            &app,
            "/register",
            "email=other%40test.com&password=a&repeat_password=b",
            None,
        )
        .await;
        assert_eq!(location(&response), "/register");
        let cookie = set_cookie(&response).unwrap();
        let page = body_text(get_page(&app, "/register", Some(&cookie)).await).await;
        assert!(page.contains("Passwords do not match"));
    }

    #[tokio::test]
    async fn failed_logins_explain_why() {
        let (app, _) = test_app();
        register(&app, "user@test.com", "hunters2").await;

        let response = login(&app, "user@test.com", "wrong").await;
        assert_eq!(location(&response), "/login");
        let cookie = set_cookie(&response).unwrap();
        let page = body_text(get_page(&app, "/login", Some(&cookie)).await).await;
        assert!(page.contains("wrong password"));

        let response = login(&app, "nouser@test.com", "x").await;
        assert_eq!(location(&response), "/login");
        let cookie = set_cookie(&response).unwrap();
        let page = body_text(get_page(&app, "/login", Some(&cookie)).await).await;
        assert!(page.contains("No user with that email address found."));
    }

    #[tokio::test]
    async fn failed_login_flash_does_not_follow_a_successful_login() {
        let (app, _) = test_app();
        register(&app, "user@test.com", "hunters2").await;
        let failed = set_cookie(&login(&app, "user@test.com", "wrong").await).unwrap();

        let response = post_form(
            &app,
            "/login",
            "email=user%40test.com&password=hunters2",
            Some(&failed),
        )
        .await;
        assert_eq!(location(&response), "/dashboard");
        let auth = set_cookie(&response).unwrap();

        let response = get_page(&app, "/dashboard", Some(&auth)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("user@test.com"));
        assert!(!page.contains("wrong password"));
    }

    #[tokio::test]
    async fn signed_in_user_reaches_dashboard_and_can_log_out() {
        let (app, _) = test_app();
        register(&app, "user@test.com", "hunters2").await;

        let response = login(&app, "user@test.com", "hunters2").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
        let auth = set_cookie(&response).unwrap();

        let response = get_page(&app, "/", Some(&auth)).await;
        assert_eq!(location(&response), "/dashboard");

        let response = get_page(&app, "/dashboard", Some(&auth)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("user@test.com"));

        for uri in ["/login", "/register"] {
            let response = get_page(&app, uri, Some(&auth)).await;
            assert_eq!(location(&response), "/dashboard");
        }

        let response = get_page(&app, "/logout", Some(&auth)).await;
        assert_eq!(location(&response), "/login");
        let after_logout = set_cookie(&response).unwrap();
        assert_ne!(after_logout, auth);

        let response = get_page(&app, "/dashboard", Some(&auth)).await;
        assert_eq!(location(&response), "/login");

        let page = body_text(get_page(&app, "/login", Some(&after_logout)).await).await;
        assert!(page.contains("successfully logged out"));
    }

    #[tokio::test]
    async fn projects_show_up_on_the_owner_dashboard() {
        let (app, _) = test_app();
        register(&app, "user@test.com", "hunters2").await;
        register(&app, "other@test.com", "hunters2").await;
        let auth = set_cookie(&login(&app, "user@test.com", "hunters2").await).unwrap();
        let other = set_cookie(&login(&app, "other@test.com", "hunters2").await).unwrap();

        let response = post_form(
            &app,
            "/projects",
            "title=Roadmap&content=first+draft",
            Some(&auth),
        )
        .await;
        assert_eq!(location(&response), "/dashboard");

        let page = body_text(get_page(&app, "/dashboard", Some(&auth)).await).await;
        assert!(page.contains("Roadmap"));
        assert!(page.contains("first draft"));

        let page = body_text(get_page(&app, "/dashboard", Some(&other)).await).await;
        assert!(!page.contains("Roadmap"));

        let response = post_form(&app, "/projects", "title=+&content=x", Some(&auth)).await;
        assert_eq!(location(&response), "/dashboard");
        let page = body_text(get_page(&app, "/dashboard", Some(&auth)).await).await;
        assert!(page.contains("A project needs a title."));
    }

    #[tokio::test]
    async fn deleted_users_fall_back_to_anonymous() {
        let (app, state) = test_app();
        register(&app, "user@test.com", "hunters2").await;
        let auth = set_cookie(&login(&app, "user@test.com", "hunters2").await).unwrap();

        let user = state
            .authenticator
            .users()
            .find_by_email("user@test.com")
            .await
            .unwrap()
            .unwrap();
        state.authenticator.users().delete(user.id).await.unwrap();

        let response = get_page(&app, "/dashboard", Some(&auth)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let response = get_page(&app, "/login", Some(&auth)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tampered_cookies_are_ignored() {
        let (app, _) = test_app();
        register(&app, "user@test.com", "hunters2").await;
        let auth = set_cookie(&login(&app, "user@test.com", "hunters2").await).unwrap();
        let (name_and_token, _) = auth.rsplit_once('.').unwrap();
        let forged = format!("{}.{}", name_and_token, "00".repeat(32));

        let response = get_page(&app, "/dashboard", Some(&forged)).await;
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn unknown_paths_fall_through_to_static_files() {
        let (app, _) = test_app();
        let response = get_page(&app, "/assets/style.css", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
