use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Store-assigned identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub i32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(UserId)
    }
}

/// Store-assigned identifier of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct ProjectId(pub i32);

/// A registered user as persisted by the store.
///
/// `password_hash` holds the digest of the secret, never the secret itself.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserRecord {
    /// Store-assigned id.
    pub id: UserId,
    /// Login identifier, unique across users.
    pub email: String,
    /// Digest of the password.
    pub password_hash: String,
    /// When the user registered.
    pub created_at: OffsetDateTime,
    /// Last change of the record.
    pub updated_at: OffsetDateTime,
}

/// A project belonging to a user.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Project {
    /// Store-assigned id.
    pub id: ProjectId,
    /// Owner of the project.
    pub user_id: UserId,
    /// Non-empty title.
    pub title: String,
    /// Free text, possibly empty.
    pub content: String,
    /// When the project was created.
    pub created_at: OffsetDateTime,
    /// Last change of the project.
    pub updated_at: OffsetDateTime,
}

/// Checked input for a project about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    /// Title, never blank.
    pub title: String,
    /// Trimmed content.
    pub content: String,
}

impl NewProject {
    /// Returns `None` when the title is blank. Content is trimmed.
    pub fn new(title: &str, content: &str) -> Option<NewProject> {
        if title.trim().is_empty() {
            return None;
        }
        Some(NewProject {
            title: title.to_string(),
            content: content.trim().to_string(),
        })
    }
}
