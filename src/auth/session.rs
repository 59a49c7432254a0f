use crate::auth::middleware::random_cookie;
use crate::settings;
use axum::http::HeaderValue;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

type HmacSha256 = Hmac<Sha256>;

/// Longest session lifetime accepted from the configuration: one year.
pub const MAX_SESSION_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// Reasons the session table cannot be set up from its configuration.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `session.secret` is empty.
    #[error("the session secret must not be empty")]
    EmptySecret,
    /// The secret was rejected as an HMAC key.
    #[error("the session secret cannot key an HMAC")]
    InvalidKey,
    /// `session.max_age_secs` is above [`MAX_SESSION_AGE_SECS`].
    #[error("the session lifetime of {0} seconds is out of range")]
    InvalidMaxAge(u64),
}

/// How a flash message is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    /// Something went through.
    Success,
    /// Something was refused.
    Error,
}

impl fmt::Display for FlashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashKind::Success => write!(f, "success"),
            FlashKind::Error => write!(f, "error"),
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    /// Styling of the message.
    pub kind: FlashKind,
    /// Text shown to the user.
    pub message: String,
}

/// What a session stores between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    /// Serialized identity of the authenticated user.
    pub identity: Option<String>,
    /// Flashes waiting for the next rendered page.
    pub flashes: Vec<Flash>,
}

impl SessionData {
    fn is_empty(&self) -> bool {
        self.identity.is_none() && self.flashes.is_empty()
    }
}

struct StoredSession {
    data: SessionData,
    expires_at: OffsetDateTime,
}

struct SessionState {
    token: Option<String>,
    data: SessionData,
    modified: bool,
    rotate: bool,
}

/// Per-request handle on the caller's session, inserted into the request
/// extensions by the session middleware. Changes are written back to the
/// [`SessionCarrier`] once the response is produced.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    fn new(token: Option<String>, data: SessionData) -> Session {
        Session {
            state: Arc::new(Mutex::new(SessionState {
                token,
                data,
                modified: false,
                rotate: false,
            })),
        }
    }

    /// The serialized identity stored in the session, if any.
    pub async fn identity(&self) -> Option<String> {
        self.state.lock().await.data.identity.clone()
    }

    /// Stores the identity under a freshly issued token. Flashes left over
    /// from the anonymous session are dropped.
    pub async fn establish(&self, identity: String) {
        let mut state = self.state.lock().await;
        state.data.identity = Some(identity);
        state.data.flashes.clear();
        state.rotate = true;
        state.modified = true;
    }

    /// Forgets the identity but keeps the session and its flashes.
    pub async fn clear_identity(&self) {
        let mut state = self.state.lock().await;
        if state.data.identity.take().is_some() {
            state.modified = true;
        }
    }

    /// Destroys the session. Anything stored afterwards goes to a new one.
    pub async fn end(&self) {
        let mut state = self.state.lock().await;
        state.data = SessionData::default();
        state.rotate = true;
        state.modified = true;
    }

    /// Queues a message for the next rendered page.
    pub async fn flash(&self, kind: FlashKind, message: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.data.flashes.push(Flash {
            kind,
            message: message.into(),
        });
        state.modified = true;
    }

    /// Removes and returns the queued flashes.
    pub async fn take_flashes(&self) -> Vec<Flash> {
        let mut state = self.state.lock().await;
        if state.data.flashes.is_empty() {
            return vec![];
        }
        state.modified = true;
        std::mem::take(&mut state.data.flashes)
    }
}

/// Server side session table addressed through signed cookies.
#[derive(Clone)]
pub struct SessionCarrier {
    sessions: Arc<Mutex<HashMap<String, StoredSession>>>,
    key: HmacSha256,
    cookie_name: String,
    max_age: Duration,
    secure: bool,
}

impl SessionCarrier {
    /// Builds an empty session table from the session settings.
    pub fn new(config: &settings::Session) -> Result<SessionCarrier, SessionError> {
        if config.secret.is_empty() {
            return Err(SessionError::EmptySecret);
        }
        let key = HmacSha256::new_from_slice(config.secret.as_bytes())
            .map_err(|_| SessionError::InvalidKey)?;
        let max_age = match i64::try_from(config.max_age_secs) {
            Ok(secs) if config.max_age_secs <= MAX_SESSION_AGE_SECS => Duration::seconds(secs),
            _ => return Err(SessionError::InvalidMaxAge(config.max_age_secs)),
        };
        Ok(SessionCarrier {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            key,
            cookie_name: config.cookie_name.clone(),
            max_age,
            secure: config.secure,
        })
    }

    /// Name of the cookie carrying the signed token.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn signature(&self, token: &str) -> String {
        let mut mac = self.key.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Cookie value for a token: the token and its signature.
    pub fn sign(&self, token: &str) -> String {
        format!("{}.{}", token, self.signature(token))
    }

    /// Returns the token of a cookie value whose signature checks out.
    pub fn unsign<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (token, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.key.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(token)
    }

    /// Opens the session named by a cookie value, or an empty one.
    pub async fn open(&self, cookie: Option<&str>) -> Session {
        let token = match cookie {
            Some(value) => match self.unsign(value) {
                Some(token) => token,
                None => {
                    tracing::warn!("ignoring session cookie with a bad signature");
                    return Session::new(None, SessionData::default());
                }
            },
            None => return Session::new(None, SessionData::default()),
        };

        let mut sessions = self.sessions.lock().await;
        let now = OffsetDateTime::now_utc();
        let found = sessions
            .get(token)
            .map(|stored| (stored.expires_at > now, stored.data.clone()));
        match found {
            Some((true, data)) => Session::new(Some(token.to_string()), data),
            Some((false, _)) => {
                tracing::debug!("session expired");
                sessions.remove(token);
                Session::new(None, SessionData::default())
            }
            None => Session::new(None, SessionData::default()),
        }
    }

    /// Writes back a modified session. Returns the `Set-Cookie` value to send
    /// when the client's cookie has to change.
    pub async fn commit(&self, session: &Session) -> Option<HeaderValue> {
        let state = session.state.lock().await;
        if !state.modified {
            return None;
        }
        let mut sessions = self.sessions.lock().await;

        let mut current = state.token.clone();
        if state.rotate {
            if let Some(old) = current.take() {
                sessions.remove(&old);
            }
        }

        if state.data.is_empty() {
            if let Some(token) = &current {
                sessions.remove(token);
            }
            return match state.token {
                Some(_) => self.header(&self.removal_cookie()),
                None => None,
            };
        }

        if let Some(token) = current {
            if let Some(stored) = sessions.get_mut(&token) {
                stored.data = state.data.clone();
                return None;
            }
        }

        let expires_at = match OffsetDateTime::now_utc().checked_add(self.max_age) {
            Some(expires_at) => expires_at,
            None => {
                tracing::error!("session expiry is out of range");
                return None;
            }
        };
        let token = random_cookie();
        sessions.insert(
            token.clone(),
            StoredSession {
                data: state.data.clone(),
                expires_at,
            },
        );
        tracing::debug!("issued a new session");
        self.header(&self.session_cookie(&token))
    }

    /// Drops every expired session and returns how many went.
    pub async fn prune_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        let now = OffsetDateTime::now_utc();
        sessions.retain(|_, stored| stored.expires_at > now);
        before - sessions.len()
    }

    /// Number of stored sessions, expired ones included until pruned.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            self.sign(token),
            self.max_age.whole_seconds()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn removal_cookie(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.cookie_name)
    }

    fn header(&self, cookie: &str) -> Option<HeaderValue> {
        match HeaderValue::from_str(cookie) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("cannot encode session cookie: {e}");
                None
            }
        }
    }
}
