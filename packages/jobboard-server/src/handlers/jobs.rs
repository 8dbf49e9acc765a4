use axum::extract::State;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ApiJson, ApiMultipart, ApiPath, ApiResponse};
use crate::auth::Identity;
use crate::cleanup::remove_job_with_resumes;
use crate::error::{ApiError, ApiResult};
use crate::geo::{miles_to_radians, GeocodeError};
use crate::models::{
    slug_candidate, slugify, Applicant, Job, JobDraft, JobInput, JobStats, Location, Role,
};
use crate::state::ServerState;
use crate::storage::JobStore;

/// Resume file extensions accepted on application
const RESUME_EXTENSIONS: [&str; 2] = ["pdf", "docx"];

/// Upper bound on `-N` suffixes tried when a slug is taken
const MAX_SLUG_ATTEMPTS: u32 = 100;

/// Slugs that would shadow a static `/job/{id}/...` route
const RESERVED_SLUGS: [&str; 1] = ["apply"];

/// First free slug for `title`: the bare slug, then `-2`, `-3`, ...
async fn unique_slug(store: &dyn JobStore, title: &str, exclude: Option<Uuid>) -> ApiResult<String> {
    let base = slugify(title);
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = slug_candidate(&base, attempt);
        if RESERVED_SLUGS.contains(&candidate.as_str()) {
            continue;
        }
        if !store.slug_exists(&candidate, exclude).await? {
            return Ok(candidate);
        }
    }
    Err(ApiError::validation(format!(
        "Too many jobs titled '{}'. Please choose another title.",
        title
    )))
}

/// Geocode a job address. Without a configured geocoder the job is stored
/// unlocated and simply won't show up in radius searches.
async fn locate(state: &ServerState, address: &str) -> ApiResult<Option<Location>> {
    match state.geocoder.geocode(address).await {
        Ok(location) => Ok(Some(location)),
        Err(GeocodeError::NotConfigured) => {
            warn!("Geocoder not configured; storing job without location");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Owners may modify their own jobs; admins may modify any
fn ensure_can_modify(identity: &Identity, job: &Job, action: &str) -> ApiResult<()> {
    if job.user == identity.id || identity.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User({}) is not allowed to {} this job.",
            identity.id, action
        )))
    }
}

/// Stored resume name: `{Name_With_Underscores}_{jobId}_{userId}.{ext}`.
/// The user id keeps applicants who share a display name apart.
fn resume_file_name(applicant_name: &str, job: Uuid, applicant: Uuid, ext: &str) -> String {
    let name: String = applicant_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}_{}_{}.{}", name, job, applicant, ext)
}

/// List all jobs, newest first
pub async fn list_jobs(State(state): State<Arc<ServerState>>) -> ApiResult<ApiResponse<Vec<Job>>> {
    let jobs = state.job_store.list_jobs().await?;
    Ok(ApiResponse::list(jobs))
}

/// Get a single job by id and slug
pub async fn get_job(
    State(state): State<Arc<ServerState>>,
    ApiPath((id, slug)): ApiPath<(Uuid, String)>,
) -> ApiResult<ApiResponse<Job>> {
    let job = state.job_store.get_job_by_slug(id, &slug).await?;
    Ok(ApiResponse::data(job))
}

/// Jobs within `distance` miles of a zipcode
pub async fn jobs_in_radius(
    State(state): State<Arc<ServerState>>,
    ApiPath((zipcode, distance)): ApiPath<(String, String)>,
) -> ApiResult<ApiResponse<Vec<Job>>> {
    let distance: f64 = distance
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::validation("Distance must be a non-negative number of miles."))?;

    let center = match state.geocoder.geocode(&zipcode).await {
        Ok(location) => location.point(),
        Err(GeocodeError::NoResults(_)) => {
            return Err(ApiError::not_found(format!(
                "No location found for zipcode {}",
                zipcode
            )))
        }
        Err(e) => return Err(ApiError::Geocode(e)),
    };

    let jobs = state
        .job_store
        .jobs_within_radius(center, miles_to_radians(distance))
        .await?;
    Ok(ApiResponse::list(jobs))
}

/// Salary and position statistics for jobs matching a topic
pub async fn job_stats(
    State(state): State<Arc<ServerState>>,
    ApiPath(topic): ApiPath<String>,
) -> ApiResult<ApiResponse<Vec<JobStats>>> {
    let stats = state.job_store.job_stats(&topic).await?;
    if stats.is_empty() {
        return Err(ApiError::not_found(format!("No stats found for - {}", topic)));
    }
    Ok(ApiResponse::data(stats))
}

/// Create a job owned by the caller
pub async fn new_job(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
    ApiJson(input): ApiJson<JobInput>,
) -> ApiResult<ApiResponse<Job>> {
    let now = Utc::now();
    let draft = input.into_draft(now).map_err(ApiError::Validation)?;

    let location = locate(&state, &draft.address).await?;
    let slug = unique_slug(state.job_store.as_ref(), &draft.title, None).await?;

    let job = Job::from_draft(Uuid::new_v4(), identity.id, slug, location, now, draft);
    state.job_store.create_job(&job).await?;

    info!("User {} created job {} ({})", identity.id, job.id, job.slug);
    Ok(ApiResponse::data(job).with_message("Job Created"))
}

/// Apply to a job with a resume upload (multipart field `file`)
pub async fn apply_to_job(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> ApiResult<ApiResponse<String>> {
    let job = state.job_store.get_job(id).await?;

    if !job.is_open(Utc::now()) {
        return Err(ApiError::validation(
            "You can not apply to this job. Date is over.",
        ));
    }

    let applicants = state.job_store.applicants(id).await?;
    if applicants.iter().any(|a| a.user == identity.id) {
        return Err(ApiError::validation("You have already applied for this job."));
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) = upload
        .filter(|(_, data)| !data.is_empty())
        .ok_or_else(|| ApiError::validation("Please upload file."))?;

    let ext = Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| RESUME_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| ApiError::validation("Please upload document file."))?;

    if data.len() > state.config.max_upload_size {
        return Err(ApiError::validation(format!(
            "Please upload file less than {} bytes.",
            state.config.max_upload_size
        )));
    }

    let resume = resume_file_name(&identity.name, job.id, identity.id, &ext);
    state.resumes.save(&resume, &data).await?;

    let applicant = Applicant {
        user: identity.id,
        resume: resume.clone(),
        applied_at: Utc::now(),
    };
    if let Err(e) = state.job_store.add_applicant(job.id, &applicant).await {
        if let Err(remove_err) = state.resumes.remove(&resume).await {
            warn!("Could not remove orphaned resume {}: {}", resume, remove_err);
        }
        return Err(e.into());
    }

    info!("User {} applied to job {} ({} bytes)", identity.id, job.id, data.len());
    Ok(ApiResponse::data(resume).with_message("Applied to Job successfully."))
}

/// Partially update a job; owner or admin only
pub async fn update_job(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<JobInput>,
) -> ApiResult<ApiResponse<Job>> {
    let mut job = state.job_store.get_job(id).await?;
    ensure_can_modify(&identity, &job, "update")?;

    let draft = JobDraft::from_job(&job)
        .merge(input)
        .map_err(ApiError::Validation)?;

    if draft.address != job.address {
        job.location = locate(&state, &draft.address).await?;
    }
    if draft.title != job.title {
        job.slug = unique_slug(state.job_store.as_ref(), &draft.title, Some(job.id)).await?;
    }
    job.apply_draft(draft);

    let updated = state.job_store.update_job(&job).await?;
    info!("User {} updated job {}", identity.id, id);
    Ok(ApiResponse::data(updated))
}

/// Delete a job and its applicants' resumes; owner or admin only
pub async fn delete_job(
    State(state): State<Arc<ServerState>>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let job = state.job_store.get_job(id).await?;
    ensure_can_modify(&identity, &job, "delete")?;

    let failures =
        remove_job_with_resumes(state.job_store.as_ref(), state.resumes.as_ref(), id).await?;
    if !failures.is_empty() {
        warn!("Job {} deleted; {} resume file(s) left behind", id, failures.len());
    }

    info!("User {} deleted job {}", identity.id, id);
    Ok(ApiResponse::message("Job is deleted."))
}
