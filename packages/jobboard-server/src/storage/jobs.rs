use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::traits::{JobStore, StorageError, StorageResult};
use crate::geo::GeoPoint;
use crate::models::{Applicant, Industry, Job, JobStats, JobWithApplicants, Location};

const JOB_SELECT: &str = r#"
    SELECT j.id, j.title, j.slug, j.description, j.email, j.address,
           j.latitude, j.longitude, j.formatted_address, j.city, j.state, j.zipcode, j.country,
           j.company, j.industry, j.job_type, j.min_education, j.max_education,
           j.positions, j.experience, j.salary, j.posting_date, j.last_date, j.user_id,
           EXISTS(SELECT 1 FROM job_applicants a WHERE a.job_id = j.id) AS applied
    FROM jobs j
"#;

fn parse_label<T: std::str::FromStr<Err = String>>(value: String) -> StorageResult<T> {
    value.parse().map_err(StorageError::Internal)
}

fn job_from_row(row: &PgRow) -> StorageResult<Job> {
    let latitude: Option<f64> = row.try_get("latitude")?;
    let longitude: Option<f64> = row.try_get("longitude")?;
    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Location {
            latitude,
            longitude,
            formatted_address: row
                .try_get::<Option<String>, _>("formatted_address")?
                .unwrap_or_default(),
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            zipcode: row.try_get("zipcode")?,
            country: row.try_get("country")?,
        }),
        _ => None,
    };

    let industry = row
        .try_get::<Vec<String>, _>("industry")?
        .into_iter()
        .map(parse_label::<Industry>)
        .collect::<StorageResult<Vec<_>>>()?;

    let max_education: Option<String> = row.try_get("max_education")?;

    Ok(Job {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        location,
        company: row.try_get("company")?,
        industry,
        job_type: parse_label(row.try_get("job_type")?)?,
        min_education: parse_label(row.try_get("min_education")?)?,
        max_education: max_education.map(parse_label).transpose()?,
        positions: row.try_get("positions")?,
        experience: parse_label(row.try_get("experience")?)?,
        salary: row.try_get("salary")?,
        posting_date: row.try_get("posting_date")?,
        last_date: row.try_get("last_date")?,
        applied: row.try_get("applied")?,
        user: row.try_get("user_id")?,
    })
}

fn map_write_error(e: sqlx::Error, job: &Job) -> StorageError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return StorageError::DuplicateSlug(job.slug.clone());
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::UserNotFound(job.user.to_string());
        }
    }
    StorageError::Database(e)
}

/// PostgreSQL implementation of JobStore
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize database schema for jobs and applications.
    /// Requires the users table to exist.
    pub async fn initialize(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id UUID PRIMARY KEY,
                title VARCHAR(100) NOT NULL,
                slug VARCHAR(255) UNIQUE NOT NULL,
                description TEXT NOT NULL,
                email VARCHAR(255) NOT NULL,
                address TEXT NOT NULL,
                latitude DOUBLE PRECISION,
                longitude DOUBLE PRECISION,
                formatted_address TEXT,
                city TEXT,
                state TEXT,
                zipcode TEXT,
                country TEXT,
                company TEXT NOT NULL,
                industry TEXT[] NOT NULL,
                job_type VARCHAR(32) NOT NULL,
                min_education VARCHAR(32) NOT NULL,
                max_education VARCHAR(32),
                positions INTEGER NOT NULL DEFAULT 1 CHECK (positions >= 1),
                experience VARCHAR(32) NOT NULL,
                salary DOUBLE PRECISION NOT NULL,
                posting_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_date TIMESTAMPTZ NOT NULL,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_applicants (
                job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                resume TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (job_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_jobs_user_id ON jobs(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_jobs_posting_date ON jobs(posting_date)",
            "CREATE INDEX IF NOT EXISTS idx_jobs_title_search ON jobs USING GIN (to_tsvector('english', title))",
            "CREATE INDEX IF NOT EXISTS idx_job_applicants_user_id ON job_applicants(user_id)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create_job(&self, job: &Job) -> StorageResult<()> {
        let location = job.location.as_ref();
        let industry: Vec<&str> = job.industry.iter().map(|i| i.as_str()).collect();

        sqlx::query(
            r#"
            INSERT INTO jobs
                (id, title, slug, description, email, address,
                 latitude, longitude, formatted_address, city, state, zipcode, country,
                 company, industry, job_type, min_education, max_education,
                 positions, experience, salary, posting_date, last_date, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.slug)
        .bind(&job.description)
        .bind(&job.email)
        .bind(&job.address)
        .bind(location.map(|l| l.latitude))
        .bind(location.map(|l| l.longitude))
        .bind(location.map(|l| l.formatted_address.as_str()))
        .bind(location.and_then(|l| l.city.as_deref()))
        .bind(location.and_then(|l| l.state.as_deref()))
        .bind(location.and_then(|l| l.zipcode.as_deref()))
        .bind(location.and_then(|l| l.country.as_deref()))
        .bind(&job.company)
        .bind(&industry)
        .bind(job.job_type.as_str())
        .bind(job.min_education.as_str())
        .bind(job.max_education.map(|e| e.as_str()))
        .bind(job.positions)
        .bind(job.experience.as_str())
        .bind(job.salary)
        .bind(job.posting_date)
        .bind(job.last_date)
        .bind(job.user)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, job))?;

        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> StorageResult<Job> {
        let row = sqlx::query(&format!("{JOB_SELECT} WHERE j.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::JobNotFound(id))?;

        job_from_row(&row)
    }

    async fn get_job_by_slug(&self, id: Uuid, slug: &str) -> StorageResult<Job> {
        let row = sqlx::query(&format!("{JOB_SELECT} WHERE j.id = $1 AND j.slug = $2"))
            .bind(id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::JobNotFound(id))?;

        job_from_row(&row)
    }

    async fn list_jobs(&self) -> StorageResult<Vec<Job>> {
        let rows = sqlx::query(&format!("{JOB_SELECT} ORDER BY j.posting_date DESC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(job_from_row).collect()
    }

    async fn jobs_within_radius(&self, center: GeoPoint, radius: f64) -> StorageResult<Vec<Job>> {
        // Haversine angle; LEAST guards ASIN against rounding just above 1
        let rows = sqlx::query(&format!(
            r#"
            {JOB_SELECT}
            WHERE j.latitude IS NOT NULL AND j.longitude IS NOT NULL
              AND 2 * ASIN(LEAST(1.0, SQRT(
                    POWER(SIN(RADIANS(j.latitude - $1) / 2), 2)
                    + COS(RADIANS($1)) * COS(RADIANS(j.latitude))
                      * POWER(SIN(RADIANS(j.longitude - $2) / 2), 2)
                  ))) <= $3
            ORDER BY j.posting_date DESC
            "#
        ))
        .bind(center.latitude)
        .bind(center.longitude)
        .bind(radius)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    async fn jobs_by_owner(&self, owner: Uuid) -> StorageResult<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "{JOB_SELECT} WHERE j.user_id = $1 ORDER BY j.posting_date DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    async fn jobs_applied_by(&self, user: Uuid) -> StorageResult<Vec<JobWithApplicants>> {
        let rows = sqlx::query(&format!(
            r#"
            {JOB_SELECT}
            JOIN job_applicants mine ON mine.job_id = j.id AND mine.user_id = $1
            ORDER BY mine.applied_at DESC
            "#
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        let mut records: HashMap<Uuid, Applicant> = HashMap::new();
        for row in sqlx::query(
            "SELECT job_id, user_id, resume, applied_at FROM job_applicants WHERE user_id = $1",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?
        .iter()
        {
            records.insert(row.try_get("job_id")?, applicant_from_row(row)?);
        }

        rows.iter()
            .map(|row| {
                let job = job_from_row(row)?;
                let applicants_applied = records.remove(&job.id).into_iter().collect();
                Ok(JobWithApplicants {
                    job,
                    applicants_applied,
                })
            })
            .collect()
    }

    async fn job_stats(&self, topic: &str) -> StorageResult<Vec<JobStats>> {
        let rows = sqlx::query(
            r#"
            SELECT experience,
                   COUNT(*) AS total_jobs,
                   AVG(positions)::DOUBLE PRECISION AS avg_positions,
                   AVG(salary) AS avg_salary,
                   MIN(salary) AS min_salary,
                   MAX(salary) AS max_salary
            FROM jobs
            WHERE to_tsvector('english', title) @@ plainto_tsquery('english', $1)
            GROUP BY experience
            ORDER BY avg_salary ASC
            "#,
        )
        .bind(topic)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(JobStats {
                    experience: parse_label(row.try_get("experience")?)?,
                    total_jobs: row.try_get("total_jobs")?,
                    avg_positions: row.try_get("avg_positions")?,
                    avg_salary: row.try_get("avg_salary")?,
                    min_salary: row.try_get("min_salary")?,
                    max_salary: row.try_get("max_salary")?,
                })
            })
            .collect()
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> StorageResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM jobs WHERE slug = $1 AND ($2::UUID IS NULL OR id <> $2)
            ) AS taken
            "#,
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("taken")?)
    }

    async fn update_job(&self, job: &Job) -> StorageResult<Job> {
        let location = job.location.as_ref();
        let industry: Vec<&str> = job.industry.iter().map(|i| i.as_str()).collect();

        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                title = $2, slug = $3, description = $4, email = $5, address = $6,
                latitude = $7, longitude = $8, formatted_address = $9,
                city = $10, state = $11, zipcode = $12, country = $13,
                company = $14, industry = $15, job_type = $16,
                min_education = $17, max_education = $18, positions = $19,
                experience = $20, salary = $21, last_date = $22
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.slug)
        .bind(&job.description)
        .bind(&job.email)
        .bind(&job.address)
        .bind(location.map(|l| l.latitude))
        .bind(location.map(|l| l.longitude))
        .bind(location.map(|l| l.formatted_address.as_str()))
        .bind(location.and_then(|l| l.city.as_deref()))
        .bind(location.and_then(|l| l.state.as_deref()))
        .bind(location.and_then(|l| l.zipcode.as_deref()))
        .bind(location.and_then(|l| l.country.as_deref()))
        .bind(&job.company)
        .bind(&industry)
        .bind(job.job_type.as_str())
        .bind(job.min_education.as_str())
        .bind(job.max_education.map(|e| e.as_str()))
        .bind(job.positions)
        .bind(job.experience.as_str())
        .bind(job.salary)
        .bind(job.last_date)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, job))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::JobNotFound(job.id));
        }

        self.get_job(job.id).await
    }

    async fn delete_job(&self, id: Uuid) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::JobNotFound(id));
        }

        Ok(())
    }

    async fn applicants(&self, job: Uuid) -> StorageResult<Vec<Applicant>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, resume, applied_at FROM job_applicants
            WHERE job_id = $1
            ORDER BY applied_at ASC
            "#,
        )
        .bind(job)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(applicant_from_row).collect()
    }

    async fn add_applicant(&self, job: Uuid, applicant: &Applicant) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO job_applicants (job_id, user_id, resume, applied_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(job)
        .bind(applicant.user)
        .bind(&applicant.resume)
        .bind(applicant.applied_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return StorageError::AlreadyApplied {
                        job,
                        user: applicant.user,
                    };
                }
                if db_err.is_foreign_key_violation() {
                    return StorageError::JobNotFound(job);
                }
            }
            StorageError::Database(e)
        })?;

        Ok(())
    }

    async fn remove_applicant(&self, job: Uuid, user: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM job_applicants WHERE job_id = $1 AND user_id = $2")
            .bind(job)
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn applicant_from_row(row: &PgRow) -> StorageResult<Applicant> {
    Ok(Applicant {
        user: row.try_get("user_id")?,
        resume: row.try_get("resume")?,
        applied_at: row.try_get("applied_at")?,
    })
}
