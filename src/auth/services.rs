use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::dto::{LoginRequest, RegisterRequest, ResetPasswordRequest},
    error::{AppError, AppResult},
    state::AppState,
    store::{NewUser, StoreError, User},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "Email already exists";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates an account. The returned record carries the password hash; map it
/// to `PublicUser` before it leaves the process.
#[instrument(skip(state, req))]
pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<User> {
    let name = req.name.trim();
    let email = req.email.trim();

    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Name, Email and Password are required"));
    }
    if !is_valid_email(email) {
        warn!(email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }

    if state.users.find_user_by_email(email).await?.is_some() {
        warn!(email, "email already registered");
        return Err(AppError::bad_request(EMAIL_TAKEN));
    }

    let password_hash = state
        .hasher
        .hash(&req.password)
        .map_err(anyhow::Error::from)?;

    let new_user = NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash,
    };
    let user = match state.users.create_user(new_user).await {
        Ok(u) => u,
        // A concurrent registration won between the lookup and the insert.
        Err(StoreError::UniqueViolation(constraint)) => {
            warn!(email, %constraint, "email taken during insert");
            return Err(AppError::bad_request(EMAIL_TAKEN));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Verifies credentials, issues a token and stores it in the user's token
/// slot, replacing whatever was there.
#[instrument(skip(state, req))]
pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<(User, String)> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Email and Password are required"));
    }

    let Some(mut user) = state.users.find_user_by_email(email).await? else {
        warn!(email, "login unknown email");
        return Err(AppError::unauthenticated(INVALID_CREDENTIALS));
    };

    if !state.hasher.verify(&req.password, &user.password_hash) {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::unauthenticated(INVALID_CREDENTIALS));
    }

    let token = state.keys.issue(user.id, user.credential_version())?;
    user.token = Some(token.clone());
    state.users.save_user(&user).await?;

    info!(user_id = user.id, "user logged in");
    Ok((user, token))
}

/// Replaces the password hash. Tokens issued before the reset stop verifying
/// because the credential version moves on.
#[instrument(skip(state, req))]
pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> AppResult<()> {
    let email = req.email.trim();
    if email.is_empty() || req.new_password.is_empty() {
        return Err(AppError::bad_request("Email and NewPassword are required"));
    }

    let Some(mut user) = state.users.find_user_by_email(email).await? else {
        warn!(email, "password reset for unknown email");
        return Err(AppError::bad_request("User not found"));
    };

    user.password_hash = state
        .hasher
        .hash(&req.new_password)
        .map_err(anyhow::Error::from)?;
    user.password_changed_at = Some(OffsetDateTime::now_utc());
    user.token = None;
    state.users.save_user(&user).await?;

    info!(user_id = user.id, "password reset");
    Ok(())
}
