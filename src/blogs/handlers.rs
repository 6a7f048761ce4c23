use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::CurrentUser,
    error::{AppError, AppResult},
    response::{ApiResponse, JsonBody},
    state::AppState,
    store::{Blog, StoreError, User},
};

use super::dto::{BlogRequest, SearchQuery};

const BLOG_NOT_FOUND: &str = "Blog not found";
const NOT_AUTHORIZED: &str = "You are not authorized to access this resource";

pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs).post(create_blog))
        .route("/blogs/search", get(search_blogs))
        .route("/blogs/single/:id", get(get_blog))
        .route("/blogs/user/:id", get(user_blogs))
        .route("/blogs/:id", put(update_blog).delete(delete_blog))
}

/// Unparseable ids cannot name a blog.
fn parse_blog_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::not_found(BLOG_NOT_FOUND))
}

async fn load_blog(state: &AppState, id: i64) -> AppResult<Blog> {
    state
        .blogs
        .find_blog(id)
        .await?
        .ok_or_else(|| AppError::not_found(BLOG_NOT_FOUND))
}

fn ensure_owner(blog: &Blog, user: &User) -> AppResult<()> {
    if blog.user_id != Some(user.id) {
        warn!(blog_id = blog.id, user_id = user.id, "blog owned by someone else");
        return Err(AppError::unauthenticated(NOT_AUTHORIZED));
    }
    Ok(())
}

fn not_found_as_blog(e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::not_found(BLOG_NOT_FOUND),
        other => other.into(),
    }
}

#[instrument(skip(state, user, payload))]
pub async fn create_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<BlogRequest>,
) -> AppResult<ApiResponse<Blog>> {
    if !payload.is_complete() {
        return Err(AppError::bad_request(
            "Title, Description, Image and Author are required",
        ));
    }
    let blog = state
        .blogs
        .create_blog(payload.into_new_blog(user.id))
        .await?;
    info!(blog_id = blog.id, user_id = user.id, "blog created");
    Ok(ApiResponse::ok("Blog created successfully", blog))
}

#[instrument(skip(state))]
pub async fn list_blogs(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<Blog>>> {
    let blogs = state.blogs.list_blogs().await?;
    Ok(ApiResponse::ok("Blogs fetched successfully", blogs))
}

#[instrument(skip(state, user))]
pub async fn search_blogs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<SearchQuery>,
) -> AppResult<ApiResponse<Vec<Blog>>> {
    let term = q.search.trim();
    let blogs = if term.is_empty() {
        state.blogs.list_blogs_by_user(user.id).await?
    } else {
        state.blogs.search_user_blogs(user.id, term).await?
    };

    if blogs.is_empty() {
        return Ok(ApiResponse::ok("No blogs found", blogs));
    }
    Ok(ApiResponse::ok("Blogs fetched successfully", blogs))
}

#[instrument(skip(state))]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Blog>> {
    let blog = load_blog(&state, parse_blog_id(&id)?).await?;
    Ok(ApiResponse::ok("Blog fetched successfully", blog))
}

/// Only the owner may list their blogs through this route.
#[instrument(skip(state, user))]
pub async fn user_blogs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<Blog>>> {
    if id.parse::<i64>().ok() != Some(user.id) {
        warn!(requested = %id, user_id = user.id, "listing another user's blogs");
        return Err(AppError::unauthenticated(NOT_AUTHORIZED));
    }
    let blogs = state.blogs.list_blogs_by_user(user.id).await?;
    Ok(ApiResponse::ok("Blogs fetched successfully", blogs))
}

#[instrument(skip(state, user, payload))]
pub async fn update_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<BlogRequest>,
) -> AppResult<ApiResponse<Blog>> {
    let blog = load_blog(&state, parse_blog_id(&id)?).await?;
    ensure_owner(&blog, &user)?;

    let updated = state
        .blogs
        .update_blog(blog.id, payload.into_changes())
        .await
        .map_err(not_found_as_blog)?;
    info!(blog_id = updated.id, user_id = user.id, "blog updated");
    Ok(ApiResponse::ok("Blog updated successfully", updated))
}

#[instrument(skip(state, user))]
pub async fn delete_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    let blog = load_blog(&state, parse_blog_id(&id)?).await?;
    ensure_owner(&blog, &user)?;

    state
        .blogs
        .delete_blog(blog.id)
        .await
        .map_err(not_found_as_blog)?;
    info!(blog_id = blog.id, user_id = user.id, "blog deleted");
    Ok(ApiResponse::message("Blog deleted successfully"))
}
