use crate::model::{NewProject, Project, ProjectId, UserId, UserRecord};
use crate::store::{ProjectStore, StoreError, UserStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    projects: BTreeMap<ProjectId, Project>,
    last_user_id: i32,
    last_project_id: i32,
}

/// Store keeping every table in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        tables.last_user_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = UserRecord {
            id: UserId(tables.last_user_id),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let removed = tables.users.remove(&id).is_some();
        if removed {
            tables.projects.retain(|_, p| p.user_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(
        &self,
        user_id: UserId,
        project: NewProject,
    ) -> Result<Project, StoreError> {
        let mut tables = self.tables.write().await;
        tables.last_project_id += 1;
        let now = OffsetDateTime::now_utc();
        let project = Project {
            id: ProjectId(tables.last_project_id),
            user_id,
            title: project.title,
            content: project.content,
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn projects_for_user(&self, user_id: UserId) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}
