/// Module containing all the authentication, registration, cookies, etc. logic.

mod authenticator;
mod digest;
mod guard;
mod login;
mod middleware;
mod register;
mod session;

pub use authenticator::{AuthError, Authenticator, RegisterError, SignUp};
pub use digest::{sha256_hex, DigestError, PasswordScheme};
pub use guard::{check_access, require_anonymous, require_authenticated, Access, Guard};
pub use login::{check_credentials, logout, serve_login};
pub use middleware::session as session_middleware;
pub use register::{register_user, serve_register};
pub use session::{Flash, FlashKind, Session, SessionCarrier, SessionError, MAX_SESSION_AGE_SECS};

use crate::model::UserRecord;

/// The user the current request is authenticated as.
#[derive(Clone, Debug)]
pub struct SessionIdentity(pub UserRecord);

const COOKIE_AUTH_LEN: usize = 64;

pub(crate) const LOGIN_PATH: &str = "/login";
pub(crate) const REGISTER_PATH: &str = "/register";
pub(crate) const DASHBOARD_PATH: &str = "/dashboard";
