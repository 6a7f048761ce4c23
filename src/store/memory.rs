use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    Blog, BlogChanges, BlogStore, NewBlog, NewUser, StoreError, StoreResult, User, UserStore,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    blogs: BTreeMap<i64, Blog>,
    next_user_id: i64,
    next_blog_id: i64,
}

/// Process-local store with the same contract as [`super::PgStore`],
/// including email uniqueness.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        tables.next_user_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: tables.next_user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            token: None,
            role: "user".into(),
            status: "active".into(),
            password_changed_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let slot = tables.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        *slot = User {
            updated_at: OffsetDateTime::now_utc(),
            created_at: slot.created_at,
            ..user.clone()
        };
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create_blog(&self, blog: NewBlog) -> StoreResult<Blog> {
        let mut tables = self.tables.write().await;
        tables.next_blog_id += 1;
        let now = OffsetDateTime::now_utc();
        let blog = Blog {
            id: tables.next_blog_id,
            title: blog.title,
            description: blog.description,
            author: blog.author,
            image: blog.image,
            user_id: Some(blog.user_id),
            created_at: now,
            updated_at: now,
        };
        tables.blogs.insert(blog.id, blog.clone());
        Ok(blog)
    }

    async fn list_blogs(&self) -> StoreResult<Vec<Blog>> {
        Ok(self.tables.read().await.blogs.values().cloned().collect())
    }

    async fn find_blog(&self, id: i64) -> StoreResult<Option<Blog>> {
        Ok(self.tables.read().await.blogs.get(&id).cloned())
    }

    async fn list_blogs_by_user(&self, user_id: i64) -> StoreResult<Vec<Blog>> {
        let tables = self.tables.read().await;
        Ok(tables
            .blogs
            .values()
            .filter(|b| b.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn search_user_blogs(&self, user_id: i64, term: &str) -> StoreResult<Vec<Blog>> {
        let needle = term.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .blogs
            .values()
            .filter(|b| b.user_id == Some(user_id))
            .filter(|b| {
                b.title.to_lowercase().contains(&needle)
                    || b.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn update_blog(&self, id: i64, changes: BlogChanges) -> StoreResult<Blog> {
        let mut tables = self.tables.write().await;
        let blog = tables.blogs.get_mut(&id).ok_or(StoreError::NotFound)?;
        changes.apply(blog);
        blog.updated_at = OffsetDateTime::now_utc();
        Ok(blog.clone())
    }

    async fn delete_blog(&self, id: i64) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .blogs
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
