use axum::extract::State;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{ApiJson, ApiResponse};
use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::models::{is_valid_email, validate_name, CreateUser, Role};
use crate::state::ServerState;
use crate::storage::StorageError;

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `user` (default) or `employer`; admins are created by the operator
    #[serde(default)]
    pub role: Role,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn invalid_login() -> ApiError {
    ApiError::InvalidCredentials("Invalid Email or Password".to_string())
}

/// Create an account and sign it in
pub async fn register(
    State(state): State<Arc<ServerState>>,
    jar: CookieJar,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(CookieJar, ApiResponse<()>)> {
    if request.role == Role::Admin {
        return Err(ApiError::validation(
            "Role (admin) can not be chosen at registration.",
        ));
    }
    validate_name(&request.name).map_err(ApiError::Validation)?;
    let email = request.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(ApiError::validation("Please enter valid email address"));
    }

    let password_hash = hash_password(&request.password)?;
    let user = state
        .user_store
        .create_user(CreateUser {
            name: request.name.trim().to_string(),
            email,
            password_hash,
            role: request.role,
        })
        .await?;

    let token = state.tokens.issue(user.id)?;
    info!("Registered {} user {}", user.role, user.id);
    Ok((
        state.tokens.set_cookie(jar, token.clone()),
        ApiResponse::token(token),
    ))
}

/// Sign in with email and password
pub async fn login(
    State(state): State<Arc<ServerState>>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<()>)> {
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return Err(ApiError::validation("Please enter email & Password"));
    };

    let user = match state.user_store.get_user_by_email(email.trim()).await {
        Ok(user) => user,
        Err(StorageError::UserNotFound(_)) => {
            warn!("Login attempt for unknown email");
            return Err(invalid_login());
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!("Invalid password for user {}", user.id);
        return Err(invalid_login());
    }

    let token = state.tokens.issue(user.id)?;
    info!("User {} logged in", user.id);
    Ok((
        state.tokens.set_cookie(jar, token.clone()),
        ApiResponse::token(token),
    ))
}

/// Expire the session cookie
pub async fn logout(
    State(state): State<Arc<ServerState>>,
    jar: CookieJar,
) -> (CookieJar, ApiResponse<()>) {
    (
        state.tokens.expire_cookie(jar),
        ApiResponse::message("Logged out successfully."),
    )
}
