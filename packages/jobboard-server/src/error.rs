//! API error type shared by every handler and middleware.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::{PasswordError, TokenError};
use crate::geo::GeocodeError;
use crate::storage::{QueryError, StorageError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Geocoding failed: {0}")]
    Geocode(GeocodeError),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidCredentials(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Geocode(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

/// Response extension marking a body that carries storage or internal
/// error details
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorDetail;

fn error_response(status: StatusCode, message: String) -> Response {
    let body = ErrorBody {
        success: false,
        message,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Geocode(e) => {
                error!("Geocoder failure: {}", e);
                error_response(status, "Location service is unavailable".to_string())
            }
            ApiError::Storage(_) | ApiError::Internal(_) => {
                error!("{}", self);
                let mut response = error_response(status, self.to_string());
                response.extensions_mut().insert(InternalErrorDetail);
                response
            }
            _ => error_response(status, self.to_string()),
        }
    }
}

/// Replace internal error details with a generic message when `production`
pub async fn redact_internal_errors(
    State(production): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if production && response.extensions().get::<InternalErrorDetail>().is_some() {
        return error_response(response.status(), "Internal Server Error".to_string());
    }
    response
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UserNotFound(_) => ApiError::not_found("User not found."),
            StorageError::JobNotFound(_) => ApiError::not_found("Job not found."),
            StorageError::DuplicateEmail(_) => ApiError::validation("Duplicate email entered."),
            StorageError::DuplicateSlug(slug) => {
                ApiError::validation(format!("A job with slug '{slug}' already exists."))
            }
            StorageError::AlreadyApplied { .. } => {
                ApiError::validation("You have already applied for this job.")
            }
            other => ApiError::Storage(other),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

/// An address that resolves to nothing is the client's problem; anything
/// else is an upstream failure.
impl From<GeocodeError> for ApiError {
    fn from(e: GeocodeError) -> Self {
        match e {
            GeocodeError::NoResults(query) => {
                ApiError::Validation(format!("Could not resolve address: {query}"))
            }
            other => ApiError::Geocode(other),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooShort(_) => ApiError::Validation(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Encoding(_) => ApiError::Internal(e.to_string()),
            TokenError::Invalid => {
                ApiError::unauthenticated("JSON Web Token is invalid. Try Again!")
            }
            TokenError::Expired => {
                ApiError::unauthenticated("JSON Web Token is expired. Try Again!")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::NotFound(format!(
            "Resource not found. Invalid: {}",
            rejection.body_text()
        ))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Validation(e.body_text())
    }
}
