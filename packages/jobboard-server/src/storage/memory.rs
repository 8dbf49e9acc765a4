//! In-memory stores backing the router tests.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::query::ListQuery;
use super::resumes::ResumeStore;
use super::traits::{JobStore, StorageError, StorageResult, UserStore};
use crate::geo::{within_radius, GeoPoint};
use crate::models::{
    Applicant, CreateUser, Experience, Job, JobStats, JobWithApplicants, Role, User,
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: CreateUser) -> StorageResult<User> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == user.email) {
            return Err(StorageError::DuplicateEmail(user.email));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> StorageResult<User> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::UserNotFound(id.to_string()))
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<User> {
        self.users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| StorageError::UserNotFound(email.to_string()))
    }

    async fn list_users(&self, query: &ListQuery) -> StorageResult<Vec<User>> {
        let users: Vec<User> = self.users.read().values().cloned().collect();
        Ok(query.apply(users))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> StorageResult<User> {
        let mut users = self.users.write();
        if let Some(email) = email {
            if users.values().any(|u| u.id != id && u.email == email) {
                return Err(StorageError::DuplicateEmail(email.to_string()));
            }
        }
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StorageError::UserNotFound(id.to_string()))?;
        if let Some(name) = name {
            user.name = name.to_string();
        }
        if let Some(email) = email {
            user.email = email.to_string();
        }
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StorageResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StorageError::UserNotFound(id.to_string()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StorageResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StorageError::UserNotFound(id.to_string()))?;
        user.role = role;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StorageResult<()> {
        self.users
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::UserNotFound(id.to_string()))
    }
}

struct StoredJob {
    job: Job,
    applicants: Vec<Applicant>,
}

impl StoredJob {
    fn snapshot(&self) -> Job {
        let mut job = self.job.clone();
        job.applied = !self.applicants.is_empty();
        job
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, StoredJob>>,
    /// Job ids whose applicant removal should fail
    failing_removals: Mutex<Vec<Uuid>>,
}

impl MemoryJobStore {
    pub fn fail_applicant_removal_for(&self, job: Uuid) {
        self.failing_removals.lock().push(job);
    }

    fn collect<F>(&self, keep: F) -> Vec<Job>
    where
        F: Fn(&StoredJob) -> bool,
    {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .values()
            .filter(|stored| keep(stored))
            .map(StoredJob::snapshot)
            .collect();
        jobs.sort_by(|a, b| b.posting_date.cmp(&a.posting_date));
        jobs
    }
}

fn title_matches(title: &str, topic: &str) -> bool {
    let title = title.to_lowercase();
    let words: Vec<String> = topic.split_whitespace().map(str::to_lowercase).collect();
    !words.is_empty() && words.iter().all(|w| title.contains(w.as_str()))
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, job: &Job) -> StorageResult<()> {
        let mut jobs = self.jobs.write();
        if jobs.values().any(|s| s.job.slug == job.slug) {
            return Err(StorageError::DuplicateSlug(job.slug.clone()));
        }
        jobs.insert(
            job.id,
            StoredJob {
                job: job.clone(),
                applicants: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> StorageResult<Job> {
        self.jobs
            .read()
            .get(&id)
            .map(StoredJob::snapshot)
            .ok_or(StorageError::JobNotFound(id))
    }

    async fn get_job_by_slug(&self, id: Uuid, slug: &str) -> StorageResult<Job> {
        self.jobs
            .read()
            .get(&id)
            .filter(|s| s.job.slug == slug)
            .map(StoredJob::snapshot)
            .ok_or(StorageError::JobNotFound(id))
    }

    async fn list_jobs(&self) -> StorageResult<Vec<Job>> {
        Ok(self.collect(|_| true))
    }

    async fn jobs_within_radius(&self, center: GeoPoint, radius: f64) -> StorageResult<Vec<Job>> {
        Ok(self.collect(|s| {
            s.job
                .location
                .as_ref()
                .is_some_and(|l| within_radius(center, l.point(), radius))
        }))
    }

    async fn jobs_by_owner(&self, owner: Uuid) -> StorageResult<Vec<Job>> {
        Ok(self.collect(|s| s.job.user == owner))
    }

    async fn jobs_applied_by(&self, user: Uuid) -> StorageResult<Vec<JobWithApplicants>> {
        let jobs = self.jobs.read();
        Ok(jobs
            .values()
            .filter_map(|s| {
                let mine: Vec<Applicant> = s
                    .applicants
                    .iter()
                    .filter(|a| a.user == user)
                    .cloned()
                    .collect();
                (!mine.is_empty()).then(|| JobWithApplicants {
                    job: s.snapshot(),
                    applicants_applied: mine,
                })
            })
            .collect())
    }

    async fn job_stats(&self, topic: &str) -> StorageResult<Vec<JobStats>> {
        let jobs = self.jobs.read();
        let mut groups: BTreeMap<Experience, Vec<&Job>> = BTreeMap::new();
        for stored in jobs.values().filter(|s| title_matches(&s.job.title, topic)) {
            groups
                .entry(stored.job.experience)
                .or_default()
                .push(&stored.job);
        }

        let mut stats: Vec<JobStats> = groups
            .into_iter()
            .map(|(experience, group)| {
                let n = group.len() as f64;
                let salaries = group.iter().map(|j| j.salary);
                JobStats {
                    experience,
                    total_jobs: group.len() as i64,
                    avg_positions: group.iter().map(|j| j.positions as f64).sum::<f64>() / n,
                    avg_salary: salaries.clone().sum::<f64>() / n,
                    min_salary: salaries.clone().fold(f64::INFINITY, f64::min),
                    max_salary: salaries.fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect();
        stats.sort_by(|a, b| a.avg_salary.total_cmp(&b.avg_salary));
        Ok(stats)
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> StorageResult<bool> {
        Ok(self
            .jobs
            .read()
            .values()
            .any(|s| s.job.slug == slug && Some(s.job.id) != exclude))
    }

    async fn update_job(&self, job: &Job) -> StorageResult<Job> {
        let mut jobs = self.jobs.write();
        if jobs
            .values()
            .any(|s| s.job.id != job.id && s.job.slug == job.slug)
        {
            return Err(StorageError::DuplicateSlug(job.slug.clone()));
        }
        let stored = jobs
            .get_mut(&job.id)
            .ok_or(StorageError::JobNotFound(job.id))?;
        let mut updated = job.clone();
        updated.user = stored.job.user;
        updated.posting_date = stored.job.posting_date;
        stored.job = updated;
        Ok(stored.snapshot())
    }

    async fn delete_job(&self, id: Uuid) -> StorageResult<()> {
        self.jobs
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::JobNotFound(id))
    }

    async fn applicants(&self, job: Uuid) -> StorageResult<Vec<Applicant>> {
        self.jobs
            .read()
            .get(&job)
            .map(|s| s.applicants.clone())
            .ok_or(StorageError::JobNotFound(job))
    }

    async fn add_applicant(&self, job: Uuid, applicant: &Applicant) -> StorageResult<()> {
        let mut jobs = self.jobs.write();
        let stored = jobs.get_mut(&job).ok_or(StorageError::JobNotFound(job))?;
        if stored.applicants.iter().any(|a| a.user == applicant.user) {
            return Err(StorageError::AlreadyApplied {
                job,
                user: applicant.user,
            });
        }
        stored.applicants.push(applicant.clone());
        Ok(())
    }

    async fn remove_applicant(&self, job: Uuid, user: Uuid) -> StorageResult<()> {
        if self.failing_removals.lock().contains(&job) {
            return Err(StorageError::Internal("applicant removal failed".to_string()));
        }
        if let Some(stored) = self.jobs.write().get_mut(&job) {
            stored.applicants.retain(|a| a.user != user);
        }
        Ok(())
    }
}

/// Resume files held in memory; removals can be made to fail
#[derive(Default)]
pub struct MemoryResumeStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_removals: bool,
}

impl MemoryResumeStore {
    pub fn failing_removals() -> Self {
        Self {
            fail_removals: true,
            ..Default::default()
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        self.files.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        if self.fail_removals {
            return Err(StorageError::Internal(format!("cannot remove {name}")));
        }
        self.files
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::Internal(format!("no such resume: {name}")))
    }
}
