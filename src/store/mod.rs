//! Persistence collaborators.
//!
//! Handlers and the account service only see [`UserStore`] and
//! [`BlogStore`]; `PgStore` backs them with Postgres, `MemoryStore` with
//! in-process maps for tests and embedding.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Stored account. Deliberately not `Serialize`: responses go through
/// `PublicUser`, which has no hash or token field.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,       // Argon2 PHC string
    pub token: Option<String>,       // last issued token, single slot
    pub role: String,
    pub status: String,
    pub password_changed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Changes whenever the password does; tokens carrying an older value are
    /// no longer accepted.
    pub fn credential_version(&self) -> i64 {
        self.password_changed_at
            .map(|t| (t.unix_timestamp_nanos() / 1_000_000) as i64)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Blog {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub author: String,
    pub image: String,
    pub user_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBlog {
    pub title: String,
    pub description: String,
    pub author: String,
    pub image: String,
    pub user_id: i64,
}

/// Partial update; `None` and empty strings leave the column untouched.
#[derive(Debug, Clone, Default)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
}

impl BlogChanges {
    pub(crate) fn non_empty(field: &Option<String>) -> Option<&str> {
        field.as_deref().filter(|v| !v.is_empty())
    }

    pub(crate) fn apply(&self, blog: &mut Blog) {
        if let Some(v) = Self::non_empty(&self.title) {
            blog.title = v.to_string();
        }
        if let Some(v) = Self::non_empty(&self.description) {
            blog.description = v.to_string();
        }
        if let Some(v) = Self::non_empty(&self.author) {
            blog.author = v.to_string();
        }
        if let Some(v) = Self::non_empty(&self.image) {
            blog.image = v.to_string();
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            // 23505 = unique_violation
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::UniqueViolation(db.constraint().unwrap_or("unique").to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    /// Fails with [`StoreError::UniqueViolation`] when the email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    /// Writes every mutable column of `user` back; `NotFound` if the row is gone.
    async fn save_user(&self, user: &User) -> StoreResult<()>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create_blog(&self, blog: NewBlog) -> StoreResult<Blog>;
    async fn list_blogs(&self) -> StoreResult<Vec<Blog>>;
    async fn find_blog(&self, id: i64) -> StoreResult<Option<Blog>>;
    async fn list_blogs_by_user(&self, user_id: i64) -> StoreResult<Vec<Blog>>;
    /// Case-insensitive substring match over title or description.
    async fn search_user_blogs(&self, user_id: i64, term: &str) -> StoreResult<Vec<Blog>>;
    async fn update_blog(&self, id: i64, changes: BlogChanges) -> StoreResult<Blog>;
    async fn delete_blog(&self, id: i64) -> StoreResult<()>;
}
