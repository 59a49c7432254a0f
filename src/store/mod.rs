//! Persistence of users and projects.
//!
//! Two interchangeable backends implement [`UserStore`] and [`ProjectStore`]:
//! [`PgStore`] on top of PostgreSQL and [`MemoryStore`] for development and
//! tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::model::{NewProject, Project, UserId, UserRecord};
use crate::settings::{Backend, Database};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failures of either backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A user with this email already exists.
    #[error("This email address is already registered.")]
    DuplicateEmail,
    /// The database refused or could not run a query.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The embedded migrations could not be applied.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Lookup and creation of user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// The user registered with `email`, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// The user with this id, if it still exists.
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Fails with [`StoreError::DuplicateEmail`] when the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<UserRecord, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;
}

/// Storage of the projects users own.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Stores a project owned by `user_id`.
    async fn create_project(
        &self,
        user_id: UserId,
        project: NewProject,
    ) -> Result<Project, StoreError>;

    /// Projects of a user in creation order.
    async fn projects_for_user(&self, user_id: UserId) -> Result<Vec<Project>, StoreError>;
}

/// Both stores, usually backed by the same connection.
#[derive(Clone)]
pub struct Stores {
    /// User records.
    pub users: Arc<dyn UserStore>,
    /// Projects of those users.
    pub projects: Arc<dyn ProjectStore>,
}

impl Stores {
    /// Fresh, empty in-memory stores.
    pub fn memory() -> Stores {
        let store = Arc::new(MemoryStore::default());
        Stores {
            users: store.clone(),
            projects: store,
        }
    }
}

/// Opens the configured backend, running migrations for PostgreSQL.
pub async fn connect(database: &Database) -> Result<Stores, StoreError> {
    match database.backend {
        Backend::Memory => {
            tracing::warn!("using the in-memory store, data is lost on restart");
            Ok(Stores::memory())
        }
        Backend::Postgres => {
            let store = Arc::new(PgStore::connect(&database.url, database.max_connections).await?);
            store.migrate().await?;
            Ok(Stores {
                users: store.clone(),
                projects: store,
            })
        }
    }
}
