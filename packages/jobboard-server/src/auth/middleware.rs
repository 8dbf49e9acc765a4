use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{extract::CookieJar, TypedHeader};
use headers::{authorization::Bearer, Authorization};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::token::TOKEN_COOKIE;
use crate::error::ApiError;
use crate::models::{Role, User};
use crate::state::ServerState;
use crate::storage::StorageError;

/// Roles allowed to publish and manage jobs
pub const PUBLISHERS: &[Role] = &[Role::Employer, Role::Admin];
/// Roles allowed to apply to jobs
pub const APPLICANTS: &[Role] = &[Role::User];
pub const ADMINS: &[Role] = &[Role::Admin];

/// The authenticated caller, attached to the request by [`authenticate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

fn login_required() -> ApiError {
    ApiError::unauthenticated("Login first to access this resource.")
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(login_required)
    }
}

/// Resolve the session token (bearer header first, then the `token`
/// cookie) to a stored user and attach its [`Identity`] to the request.
pub async fn authenticate(
    State(state): State<Arc<ServerState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
        .or_else(|| {
            jar.get(TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|v| !v.is_empty())
        })
        .ok_or_else(login_required)?;

    let user_id = state.tokens.verify(&token).map_err(|e| {
        debug!("Rejected session token: {}", e);
        ApiError::from(e)
    })?;

    let user = match state.user_store.get_user(user_id).await {
        Ok(user) => user,
        Err(StorageError::UserNotFound(_)) => {
            warn!("Token presented for deleted user {}", user_id);
            return Err(ApiError::unauthenticated(
                "The user belonging to this token no longer exists.",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    request.extensions_mut().insert(Identity::from(&user));
    Ok(next.run(request).await)
}

/// Allow the caller only if their role is in `allowed`
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Role ({}) is not allowed to access this resource.",
            identity.role
        )))
    }
}

/// Route layer enforcing [`authorize`]; must run after [`authenticate`]
pub async fn authorize_roles(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(login_required)?;
    authorize(identity, allowed)?;
    Ok(next.run(request).await)
}
