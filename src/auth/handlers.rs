use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest, ResetPasswordRequest},
        extractors::CurrentUser,
        services,
    },
    error::AppResult,
    response::{ApiResponse, JsonBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/validate", get(validate))
        .route("/auth/resetpassword", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = services::register(&state, payload).await?;
    Ok(ApiResponse::ok("User created successfully", PublicUser::from(&user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let (user, token) = services::login(&state, payload).await?;
    Ok(ApiResponse::ok(
        "User logged in successfully",
        LoginResponse {
            user: PublicUser::from(&user),
            token,
        },
    ))
}

#[instrument(skip_all)]
pub async fn validate(CurrentUser(user): CurrentUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok("User is authenticated", PublicUser::from(&user))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ResetPasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    services::reset_password(&state, payload).await?;
    Ok(ApiResponse::message("Password reset successfully"))
}
