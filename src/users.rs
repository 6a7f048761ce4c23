use axum::{extract::State, routing::get, Router};
use tracing::instrument;

use crate::{
    auth::{dto::PublicUser, extractors::CurrentUser},
    error::AppResult,
    response::ApiResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(list_users))
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> AppResult<ApiResponse<Vec<PublicUser>>> {
    let users = state.users.list_users().await?;
    Ok(ApiResponse::ok(
        "Users fetched successfully",
        users.iter().map(PublicUser::from).collect(),
    ))
}
