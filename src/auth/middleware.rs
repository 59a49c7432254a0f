use crate::{
    auth::{SessionIdentity, COOKIE_AUTH_LEN},
    AppState,
};
use axum::{
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::Rng;
use std::collections::HashMap;

/// Create a random cookie token with alphanums characters.
pub fn random_cookie() -> String {
    let mut rng = rand::thread_rng();
    (&mut rng)
        .sample_iter(rand::distributions::Alphanumeric)
        .take(COOKIE_AUTH_LEN)
        .map(char::from)
        .collect()
}

/// Create a HashMap with the content of the cookie header.
fn get_cookie_map<B>(req: &Request<B>) -> HashMap<String, String> {
    req.headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|cookie_str| cookie_str.split(';'))
        .filter_map(|cookie_pair| {
            let (name, value) = cookie_pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Loads the caller's session, resolves its identity and writes the session
/// back once the inner service has answered.
///
/// A resolved user is made available to handlers as [`SessionIdentity`]. A
/// stored identity naming a user that no longer exists is dropped and the
/// request continues as anonymous.
pub async fn session<B>(mut req: Request<B>, next: Next<B>, state: AppState) -> Response {
    let cookies = get_cookie_map(&req);
    let session = state
        .sessions
        .open(cookies.get(state.sessions.cookie_name()).map(String::as_str))
        .await;

    if let Some(serialized) = session.identity().await {
        match state.authenticator.deserialize_identity(&serialized).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(SessionIdentity(user));
            }
            Ok(None) => {
                tracing::debug!("session identity {} does not resolve any more", serialized);
                session.clear_identity().await;
            }
            Err(e) => {
                tracing::error!("cannot resolve session identity: {e}");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal database error")
                    .into_response();
            }
        }
    }

    req.extensions_mut().insert(session.clone());
    let mut response = next.run(req).await;
    if let Some(cookie) = state.sessions.commit(&session).await {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}
