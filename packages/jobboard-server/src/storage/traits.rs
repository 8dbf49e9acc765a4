use async_trait::async_trait;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::{Applicant, CreateUser, Job, JobStats, JobWithApplicants, Role, User};
use crate::storage::query::ListQuery;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("User {user} already applied to job {job}")]
    AlreadyApplied { job: Uuid, user: Uuid },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Storage backend for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new user
    async fn create_user(&self, user: CreateUser) -> StorageResult<User>;

    /// Get user by ID
    async fn get_user(&self, id: Uuid) -> StorageResult<User>;

    /// Get user by email
    async fn get_user_by_email(&self, email: &str) -> StorageResult<User>;

    /// List users matching a filter/sort/pagination query
    async fn list_users(&self, query: &ListQuery) -> StorageResult<Vec<User>>;

    /// Change name and/or email; absent fields are left untouched
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> StorageResult<User>;

    /// Update user's password hash
    async fn update_password(&self, id: Uuid, password_hash: &str) -> StorageResult<()>;

    /// Change user's role (operator only)
    async fn set_role(&self, id: Uuid, role: Role) -> StorageResult<()>;

    /// Delete user
    async fn delete_user(&self, id: Uuid) -> StorageResult<()>;
}

/// Storage backend for jobs and their applicant records
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job
    async fn create_job(&self, job: &Job) -> StorageResult<()>;

    /// Get job by ID
    async fn get_job(&self, id: Uuid) -> StorageResult<Job>;

    /// Get job by ID and slug; both must match
    async fn get_job_by_slug(&self, id: Uuid, slug: &str) -> StorageResult<Job>;

    /// All jobs, newest first
    async fn list_jobs(&self) -> StorageResult<Vec<Job>>;

    /// Jobs whose location lies within `radius` radians of `center`
    async fn jobs_within_radius(&self, center: GeoPoint, radius: f64) -> StorageResult<Vec<Job>>;

    /// Jobs owned by a user
    async fn jobs_by_owner(&self, owner: Uuid) -> StorageResult<Vec<Job>>;

    /// Jobs a user applied to, with their applicant records
    async fn jobs_applied_by(&self, user: Uuid) -> StorageResult<Vec<JobWithApplicants>>;

    /// Aggregates for jobs whose title matches `topic`, grouped by experience
    async fn job_stats(&self, topic: &str) -> StorageResult<Vec<JobStats>>;

    /// Whether a slug is taken by a job other than `exclude`
    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> StorageResult<bool>;

    /// Persist the editable fields, slug and location of an existing job
    async fn update_job(&self, job: &Job) -> StorageResult<Job>;

    /// Delete a job and its applicant records
    async fn delete_job(&self, id: Uuid) -> StorageResult<()>;

    /// Applicant records for a job, in application order
    async fn applicants(&self, job: Uuid) -> StorageResult<Vec<Applicant>>;

    /// Append an applicant record; fails if the user already applied
    async fn add_applicant(&self, job: Uuid, applicant: &Applicant) -> StorageResult<()>;

    /// Remove a user's applicant record from a job
    async fn remove_applicant(&self, job: Uuid, user: Uuid) -> StorageResult<()>;
}
