use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    Blog, BlogChanges, BlogStore, NewBlog, NewUser, StoreError, StoreResult, User, UserStore,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, token, role, status, \
                            password_changed_at, created_at, updated_at";
const BLOG_COLUMNS: &str = "id, title, description, author, image, user_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Escapes LIKE metacharacters so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET name = $2, email = $3, password_hash = $4, token = $5,
                   role = $6, status = $7, password_changed_at = $8, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.token)
        .bind(&user.role)
        .bind(&user.status)
        .bind(user.password_changed_at)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}

#[async_trait]
impl BlogStore for PgStore {
    async fn create_blog(&self, blog: NewBlog) -> StoreResult<Blog> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            r#"
            INSERT INTO blogs (title, description, author, image, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(&blog.title)
        .bind(&blog.description)
        .bind(&blog.author)
        .bind(&blog.image)
        .bind(blog.user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(blog)
    }

    async fn list_blogs(&self) -> StoreResult<Vec<Blog>> {
        let rows = sqlx::query_as::<_, Blog>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_blog(&self, id: i64) -> StoreResult<Option<Blog>> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(blog)
    }

    async fn list_blogs_by_user(&self, user_id: i64) -> StoreResult<Vec<Blog>> {
        let rows = sqlx::query_as::<_, Blog>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn search_user_blogs(&self, user_id: i64, term: &str) -> StoreResult<Vec<Blog>> {
        let rows = sqlx::query_as::<_, Blog>(&format!(
            r#"
            SELECT {BLOG_COLUMNS}
              FROM blogs
             WHERE user_id = $1
               AND (title ILIKE $2 ESCAPE '\' OR description ILIKE $2 ESCAPE '\')
             ORDER BY id
            "#
        ))
        .bind(user_id)
        .bind(like_pattern(term))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update_blog(&self, id: i64, changes: BlogChanges) -> StoreResult<Blog> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            r#"
            UPDATE blogs
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   author = COALESCE($4, author),
                   image = COALESCE($5, image),
                   updated_at = now()
             WHERE id = $1
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(BlogChanges::non_empty(&changes.title))
        .bind(BlogChanges::non_empty(&changes.description))
        .bind(BlogChanges::non_empty(&changes.author))
        .bind(BlogChanges::non_empty(&changes.image))
        .fetch_optional(&self.db)
        .await?;
        blog.ok_or(StoreError::NotFound)
    }

    async fn delete_blog(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
