/// This module is used to parse and read from configuration files for the
/// server.
use crate::auth::PasswordScheme;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// The storage backend holding users and projects.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// PostgreSQL, reached through `database.url`.
    Postgres,
    /// Process-local tables, lost on restart.
    Memory,
}

/// This configuration object contains the database config.
#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    /// Which store implementation to use.
    #[serde(default = "default_backend")]
    pub backend: Backend,
    /// Database url.
    pub url: String,
    /// Maximum number of connections to the database.
    pub max_connections: u32,
}

fn default_backend() -> Backend {
    Backend::Postgres
}

/// Cookie session configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Session {
    /// Key used to sign session cookies.
    pub secret: String,
    /// Lifetime of a session in seconds, counted from its creation.
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Only send the cookie over HTTPS.
    #[serde(default)]
    pub secure: bool,
}

fn default_max_age() -> u64 {
    60 * 60
}

fn default_cookie_name() -> String {
    "gate.sid".to_string()
}

/// This configuration object contains the authentication config.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Auth {
    /// Digest applied to passwords of newly registered users.
    #[serde(default)]
    pub password_scheme: PasswordScheme,
}

/// The app wide settings
#[derive(Debug, Deserialize, Clone)]
pub struct BaseSettings {
    /// Socket address the server listens on.
    pub address: String,
    /// The rust log parameter. Describes how much logging is wanted.
    pub rust_log: Option<String>,
    /// Directory served for every path no route matches.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_static_dir() -> String {
    "./public".to_string()
}

/// This structure contains all the config parameters of the app.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Settings related to the database.
    pub database: Database,
    /// Session cookie config.
    pub session: Session,
    /// Authentication config.
    #[serde(default)]
    pub auth: Auth,
    /// The app-wide config.
    pub base: BaseSettings,
}

impl Settings {
    /// Creates a new configuration form config files and environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(".env").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("gate")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        s.try_deserialize()
    }
}
