use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::{
    auth::jwt::TokenError,
    error::AppError,
    state::AppState,
    store::User,
};

/// The authenticated caller. Taking this extractor makes a handler
/// protected: the handler only runs if [`authenticate`] succeeded.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await.map(CurrentUser)
    }
}

/// Bearer token from `Authorization`, falling back to the configured cookie.
pub fn bearer_token<'a>(headers: &'a HeaderMap, cookie_name: Option<&str>) -> Option<&'a str> {
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        return auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());
    }

    let name = cookie_name?;
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// Resolves the request's token to a stored user. Never writes.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers, state.config.auth_cookie.as_deref()).ok_or_else(|| {
        debug!("no bearer token on request");
        AppError::unauthenticated("Missing authorization token")
    })?;

    let claims = state.keys.verify(token).map_err(|e| {
        match &e {
            TokenError::Expired => warn!("expired token"),
            TokenError::Invalid(err) => warn!(error = %err, "invalid token"),
        }
        AppError::unauthenticated("Invalid or expired token")
    })?;

    let user_id = claims.user_id().ok_or_else(|| {
        warn!(sub = %claims.sub, "token subject is not a user id");
        AppError::unauthenticated("Invalid or expired token")
    })?;

    let Some(user) = state.users.find_user_by_id(user_id).await? else {
        warn!(user_id, "token subject no longer exists");
        return Err(AppError::unauthenticated("User not found"));
    };

    if claims.ver != user.credential_version() {
        warn!(user_id, "token predates password change");
        return Err(AppError::unauthenticated("Invalid or expired token"));
    }

    Ok(user)
}
