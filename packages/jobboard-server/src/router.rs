use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::auth::{authenticate, authorize_roles, ADMINS, APPLICANTS, PUBLISHERS};
use crate::error::redact_internal_errors;
use crate::handlers::{
    applied_jobs, apply_to_job, delete_job, delete_profile, delete_user, get_job, get_profile,
    health_check, job_stats, jobs_in_radius, list_jobs, list_users, login, logout, new_job,
    published_jobs, register, route_not_found, update_job, update_password, update_profile,
};
use crate::state::ServerState;

pub const API_PREFIX: &str = "/api/v1";

/// Room for multipart framing around the largest accepted resume
const MULTIPART_OVERHEAD: usize = 64 * 1024;
const MIN_BODY_LIMIT: usize = 1024 * 1024;

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": "Internal Server Error" })),
    )
        .into_response()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

/// Build the application router
pub fn build_router(state: Arc<ServerState>) -> Router {
    let auth = || middleware::from_fn_with_state(state.clone(), authenticate);

    let job_reads = Router::new()
        .route("/jobs", get(list_jobs))
        .route("/job/{id}/{slug}", get(get_job))
        .route("/jobs/{zipcode}/{distance}", get(jobs_in_radius))
        .route("/stats/{topic}", get(job_stats));
    let job_reads = if state.config.public_job_reads {
        job_reads
    } else {
        job_reads.route_layer(auth())
    };

    // route_layer wraps what came before it, so authenticate runs first
    let publisher_routes = Router::new()
        .route("/job/new", post(new_job))
        .route("/job/{id}", put(update_job).delete(delete_job))
        .route("/jobs/published", get(published_jobs))
        .route_layer(middleware::from_fn_with_state(PUBLISHERS, authorize_roles))
        .route_layer(auth());

    let applicant_routes = Router::new()
        .route("/job/{id}/apply", put(apply_to_job))
        .route("/jobs/applied", get(applied_jobs))
        .route_layer(middleware::from_fn_with_state(APPLICANTS, authorize_roles))
        .route_layer(auth());

    let account_routes = Router::new()
        .route("/profile", get(get_profile))
        .route("/password/update", put(update_password))
        .route("/profile/update", put(update_profile))
        .route("/profile/delete", delete(delete_profile))
        .route_layer(auth());

    let admin_routes = Router::new()
        .route("/users", get(list_users))
        .route("/user/{id}", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(ADMINS, authorize_roles))
        .route_layer(auth());

    let public_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout));

    let api = Router::new()
        .merge(job_reads)
        .merge(publisher_routes)
        .merge(applicant_routes)
        .merge(account_routes)
        .merge(admin_routes)
        .merge(public_routes);

    let body_limit = (state.config.max_upload_size + MULTIPART_OVERHEAD).max(MIN_BODY_LIMIT);

    Router::new()
        .route("/health", get(health_check))
        .nest(API_PREFIX, api)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn_with_state(
            state.config.is_production(),
            redact_internal_errors,
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
