use axum::extract::{Query, State};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ApiJson, ApiPath, ApiResponse};
use crate::auth::{hash_password, verify_password, Identity};
use crate::cleanup::delete_user_data;
use crate::error::{ApiError, ApiResult};
use crate::models::{Job, JobWithApplicants, ProfileUpdate, PublishedJobSummary, User};
use crate::state::ServerState;
use crate::storage::{ListQuery, USER_DEFAULT_SORT, USER_FIELDS};

/// Caller's profile; publishers also see a summary of their jobs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs_published: Option<Vec<PublishedJobSummary>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdate {
    pub current_password: String,
    pub new_password: String,
}

/// Run the cascade cleanup for `user`, then delete the account itself
async fn remove_account(state: &ServerState, user: &User) -> ApiResult<()> {
    let report =
        delete_user_data(state.job_store.as_ref(), state.resumes.as_ref(), user).await?;
    if !report.is_clean() {
        warn!(
            "Deleting user {} with incomplete cleanup ({} failed job step(s))",
            user.id,
            report.failed.len()
        );
    }
    state.user_store.delete_user(user.id).await?;
    Ok(())
}

/// Get the current user's profile
pub async fn get_profile(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
) -> ApiResult<ApiResponse<ProfileResponse>> {
    let user = state.user_store.get_user(identity.id).await?;

    let jobs_published = if user.role.can_publish() {
        let jobs = state.job_store.jobs_by_owner(user.id).await?;
        Some(jobs.iter().map(PublishedJobSummary::from).collect())
    } else {
        None
    };

    Ok(ApiResponse::data(ProfileResponse {
        user,
        jobs_published,
    }))
}

/// Change the current user's password and issue a fresh token
pub async fn update_password(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
    jar: CookieJar,
    ApiJson(request): ApiJson<PasswordUpdate>,
) -> ApiResult<(CookieJar, ApiResponse<()>)> {
    let user = state.user_store.get_user(identity.id).await?;

    if !verify_password(&request.current_password, &user.password_hash)? {
        warn!("Wrong current password on password change for user {}", user.id);
        return Err(ApiError::InvalidCredentials(
            "Old Password is incorrect.".to_string(),
        ));
    }

    let password_hash = hash_password(&request.new_password)?;
    state
        .user_store
        .update_password(user.id, &password_hash)
        .await?;

    let token = state.tokens.issue(user.id)?;
    info!("User {} changed their password", user.id);
    Ok((
        state.tokens.set_cookie(jar, token.clone()),
        ApiResponse::token(token),
    ))
}

/// Update the current user's name and/or email
pub async fn update_profile(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<ApiResponse<User>> {
    let update = ProfileUpdate {
        name: update.name.map(|n| n.trim().to_string()),
        email: update.email.map(|e| e.trim().to_string()),
    };
    update.validate().map_err(ApiError::Validation)?;

    let user = state
        .user_store
        .update_profile(identity.id, update.name.as_deref(), update.email.as_deref())
        .await?;
    Ok(ApiResponse::data(user))
}

/// Jobs the current user applied to
pub async fn applied_jobs(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
) -> ApiResult<ApiResponse<Vec<JobWithApplicants>>> {
    let jobs = state.job_store.jobs_applied_by(identity.id).await?;
    Ok(ApiResponse::list(jobs))
}

/// Jobs published by the current user
pub async fn published_jobs(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
) -> ApiResult<ApiResponse<Vec<Job>>> {
    let jobs = state.job_store.jobs_by_owner(identity.id).await?;
    Ok(ApiResponse::list(jobs))
}

/// Delete the current user's account and everything attached to it
pub async fn delete_profile(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<()>)> {
    let user = state.user_store.get_user(identity.id).await?;
    remove_account(&state, &user).await?;

    info!("User {} deleted their account", user.id);
    Ok((
        state.tokens.expire_cookie(jar),
        ApiResponse::message("Your account has been deleted."),
    ))
}

/// Admin: list users with filter/sort/fields/pagination parameters
pub async fn list_users(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<ApiResponse<Vec<Value>>> {
    let query = ListQuery::parse(&params, &USER_FIELDS, USER_DEFAULT_SORT)?;
    let users = state.user_store.list_users(&query).await?;

    let data = users
        .iter()
        .map(|user| {
            serde_json::to_value(user)
                .map(|value| query.project(value))
                .map_err(|e| ApiError::internal(e.to_string()))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(ApiResponse::list(data))
}

/// Admin: delete a user and everything attached to it
pub async fn delete_user(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let user = state.user_store.get_user(id).await?;
    remove_account(&state, &user).await?;

    info!("Admin {} deleted user {}", identity.id, id);
    Ok(ApiResponse::message("User is deleted by Admin."))
}
