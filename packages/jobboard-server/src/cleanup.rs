//! Removal of the data a user leaves behind when their account is deleted.
//!
//! Employers and admins lose every job they published, including the resume
//! files applicants uploaded to those jobs. Regular users have their
//! applications withdrawn and their resume files removed. Each job is handled
//! independently and the outcome of every step is collected into a
//! [`CleanupReport`]; nothing spans the whole loop transactionally.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Role, User};
use crate::storage::{JobStore, ResumeStore, StorageResult};

/// Outcome of a user-data cleanup
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Jobs deleted (publishers) or withdrawn from (applicants)
    pub succeeded: Vec<Uuid>,
    /// Jobs whose cleanup step failed, with the reason
    pub failed: Vec<(Uuid, String)>,
    /// Resume files that could not be removed, with the reason
    pub resume_failures: Vec<(String, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.resume_failures.is_empty()
    }

    fn log(&self, user: Uuid) {
        if self.is_clean() {
            info!(
                "Cleaned up data of user {}: {} job(s) processed",
                user,
                self.succeeded.len()
            );
        } else {
            warn!(
                "Partial cleanup for user {}: {} succeeded, {} failed, {} resume file(s) left behind",
                user,
                self.succeeded.len(),
                self.failed.len(),
                self.resume_failures.len()
            );
            for (job, reason) in &self.failed {
                warn!("  job {}: {}", job, reason);
            }
            for (file, reason) in &self.resume_failures {
                warn!("  resume {}: {}", file, reason);
            }
        }
    }
}

/// Delete a job, then remove its applicants' resume files. File removal is
/// best-effort; failures are returned as `(file, reason)` pairs.
pub async fn remove_job_with_resumes(
    jobs: &dyn JobStore,
    resumes: &dyn ResumeStore,
    job: Uuid,
) -> StorageResult<Vec<(String, String)>> {
    let applicants = jobs.applicants(job).await?;
    jobs.delete_job(job).await?;

    let mut failures = Vec::new();
    for applicant in applicants {
        if let Err(e) = resumes.remove(&applicant.resume).await {
            warn!("Could not remove resume {}: {}", applicant.resume, e);
            failures.push((applicant.resume, e.to_string()));
        }
    }
    Ok(failures)
}

/// Remove everything `user` owns or contributed before the account goes
pub async fn delete_user_data(
    jobs: &dyn JobStore,
    resumes: &dyn ResumeStore,
    user: &User,
) -> StorageResult<CleanupReport> {
    let mut report = CleanupReport::default();

    match user.role {
        Role::Employer | Role::Admin => {
            for job in jobs.jobs_by_owner(user.id).await? {
                match remove_job_with_resumes(jobs, resumes, job.id).await {
                    Ok(failures) => {
                        debug!("Deleted job {} of user {}", job.id, user.id);
                        report.succeeded.push(job.id);
                        report.resume_failures.extend(failures);
                    }
                    Err(e) => report.failed.push((job.id, e.to_string())),
                }
            }
        }
        Role::User => {
            for applied in jobs.jobs_applied_by(user.id).await? {
                let job_id = applied.job.id;
                for applicant in applied.applicants_applied.iter().filter(|a| a.user == user.id) {
                    if let Err(e) = resumes.remove(&applicant.resume).await {
                        warn!("Could not remove resume {}: {}", applicant.resume, e);
                        report
                            .resume_failures
                            .push((applicant.resume.clone(), e.to_string()));
                    }
                }
                match jobs.remove_applicant(job_id, user.id).await {
                    Ok(()) => report.succeeded.push(job_id),
                    Err(e) => report.failed.push((job_id, e.to_string())),
                }
            }
        }
    }

    report.log(user.id);
    Ok(report)
}
