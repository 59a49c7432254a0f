use crate::model::{NewProject, Project, UserId, UserRecord};
use crate::store::{ProjectStore, StoreError, UserStore};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

const UNIQUE_VIOLATION: &str = "23505";

/// Users and projects kept in PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens a connection pool on `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<PgStore, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(PgStore { pool })
    }

    /// Applies the migrations embedded from `database/migrations`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("database/migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, email, password_hash, created_at, updated_at
               FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, email, password_hash, created_at, updated_at
               FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            r#"INSERT INTO users (email, password_hash) VALUES ( $1, $2 )
               RETURNING id, email, password_hash, created_at, updated_at"#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(
        &self,
        user_id: UserId,
        project: NewProject,
    ) -> Result<Project, StoreError> {
        let project = sqlx::query_as::<_, Project>(
            r#"INSERT INTO projects (user_id, title, content) VALUES ( $1, $2, $3 )
               RETURNING id, user_id, title, content, created_at, updated_at"#,
        )
        .bind(user_id)
        .bind(project.title)
        .bind(project.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(project)
    }

    async fn projects_for_user(&self, user_id: UserId) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(
            r#"SELECT id, user_id, title, content, created_at, updated_at
               FROM projects WHERE user_id = $1 ORDER BY id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }
}
