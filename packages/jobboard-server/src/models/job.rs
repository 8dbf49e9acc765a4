use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum lengths for input validation
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Days a posting stays open when no `lastDate` is given
pub const DEFAULT_OPEN_DAYS: i64 = 7;

/// Declares a closed set of labels stored as text and exchanged as JSON strings.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(format!("Unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

labelled_enum!(
    /// Industry a job belongs to
    Industry {
        Business => "Business",
        InformationTechnology => "Information Technology",
        Banking => "Banking",
        EducationTraining => "Education/Training",
        Telecommunication => "Telecommunication",
        Others => "Others",
    }
);

labelled_enum!(
    /// Contract type
    JobType {
        Permanent => "Permanent",
        Temporary => "Temporary",
        Internship => "Internship",
        FullTime => "Full-time",
        PartTime => "Part-time",
    }
);

labelled_enum!(
    /// Education level, ordered from lowest to highest
    Education {
        Bachelors => "Bachelors",
        Masters => "Masters",
        Phd => "Phd",
    }
);

labelled_enum!(
    /// Experience bracket
    Experience {
        NoExperience => "No Experience",
        OneToTwoYears => "1 Year - 2 Years",
        TwoToFiveYears => "2 Year - 5 Years",
        FivePlusYears => "5 Years+",
    }
);

/// Geocoded position of a job's address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

/// One application to a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    /// Applying user
    pub user: Uuid,
    /// Stored resume file name
    pub resume: String,
    pub applied_at: DateTime<Utc>,
}

/// A published job. Applicant records are loaded separately and are not
/// part of the default representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub email: String,
    pub address: String,
    pub location: Option<Location>,
    pub company: String,
    pub industry: Vec<Industry>,
    pub job_type: JobType,
    pub min_education: Education,
    pub max_education: Option<Education>,
    pub positions: i32,
    pub experience: Experience,
    pub salary: f64,
    pub posting_date: DateTime<Utc>,
    pub last_date: DateTime<Utc>,
    /// True once at least one applicant record exists
    pub applied: bool,
    /// Owning employer
    pub user: Uuid,
}

impl Job {
    pub fn from_draft(
        id: Uuid,
        owner: Uuid,
        slug: String,
        location: Option<Location>,
        posting_date: DateTime<Utc>,
        draft: JobDraft,
    ) -> Self {
        Self {
            id,
            title: draft.title,
            slug,
            description: draft.description,
            email: draft.email,
            address: draft.address,
            location,
            company: draft.company,
            industry: draft.industry,
            job_type: draft.job_type,
            min_education: draft.min_education,
            max_education: draft.max_education,
            positions: draft.positions,
            experience: draft.experience,
            salary: draft.salary,
            posting_date,
            last_date: draft.last_date,
            applied: false,
            user: owner,
        }
    }

    /// Copy the editable fields of a validated draft onto this job
    pub fn apply_draft(&mut self, draft: JobDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.email = draft.email;
        self.address = draft.address;
        self.company = draft.company;
        self.industry = draft.industry;
        self.job_type = draft.job_type;
        self.min_education = draft.min_education;
        self.max_education = draft.max_education;
        self.positions = draft.positions;
        self.experience = draft.experience;
        self.salary = draft.salary;
        self.last_date = draft.last_date;
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.last_date >= now
    }
}

/// Job plus its applicant records, used where applications are shown
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobWithApplicants {
    #[serde(flatten)]
    pub job: Job,
    pub applicants_applied: Vec<Applicant>,
}

/// Summary of a published job shown on the employer's profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedJobSummary {
    pub id: Uuid,
    pub title: String,
    pub posting_date: DateTime<Utc>,
}

impl From<&Job> for PublishedJobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            posting_date: job.posting_date,
        }
    }
}

/// Aggregates for jobs matching a stats topic, one row per experience bracket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub experience: Experience,
    pub total_jobs: i64,
    pub avg_positions: f64,
    pub avg_salary: f64,
    pub min_salary: f64,
    pub max_salary: f64,
}

/// Client input for creating or updating a job. Every field is optional
/// here so that create can report which required field is missing and
/// update can merge only what was sent. Ownership, slug and applicants are
/// not accepted from clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
    pub industry: Option<Vec<Industry>>,
    #[serde(alias = "type")]
    pub job_type: Option<JobType>,
    pub min_education: Option<Education>,
    pub max_education: Option<Education>,
    pub positions: Option<i32>,
    pub experience: Option<Experience>,
    pub salary: Option<f64>,
    pub last_date: Option<DateTime<Utc>>,
}

/// Complete set of editable job fields
#[derive(Debug, Clone, PartialEq)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub email: String,
    pub address: String,
    pub company: String,
    pub industry: Vec<Industry>,
    pub job_type: JobType,
    pub min_education: Education,
    pub max_education: Option<Education>,
    pub positions: i32,
    pub experience: Experience,
    pub salary: f64,
    pub last_date: DateTime<Utc>,
}

fn required<T>(value: Option<T>, message: &str) -> Result<T, String> {
    value.ok_or_else(|| message.to_string())
}

impl JobInput {
    /// Build a draft for a new job, failing on the first missing required field
    pub fn into_draft(self, posting_date: DateTime<Utc>) -> Result<JobDraft, String> {
        let draft = JobDraft {
            title: required(self.title, "Please enter Job title.")?,
            description: required(self.description, "Please enter Job description.")?,
            email: required(self.email, "Please add a valid email address.")?,
            address: required(self.address, "Please add an address.")?,
            company: required(self.company, "Please add Company name.")?,
            industry: required(self.industry, "Please enter industry for this job.")?,
            job_type: required(self.job_type, "Please enter job type.")?,
            min_education: required(
                self.min_education,
                "Please enter minimum education for this job.",
            )?,
            max_education: self.max_education,
            positions: self.positions.unwrap_or(1),
            experience: required(
                self.experience,
                "Please enter experience required for this job.",
            )?,
            salary: required(self.salary, "Please enter expected salary for this job.")?,
            last_date: self
                .last_date
                .unwrap_or_else(|| posting_date + Duration::days(DEFAULT_OPEN_DAYS)),
        };
        draft.validate()?;
        if draft.last_date < posting_date {
            return Err("Last date to apply can not be in the past.".to_string());
        }
        Ok(draft)
    }
}

impl JobDraft {
    pub fn from_job(job: &Job) -> Self {
        Self {
            title: job.title.clone(),
            description: job.description.clone(),
            email: job.email.clone(),
            address: job.address.clone(),
            company: job.company.clone(),
            industry: job.industry.clone(),
            job_type: job.job_type,
            min_education: job.min_education,
            max_education: job.max_education,
            positions: job.positions,
            experience: job.experience,
            salary: job.salary,
            last_date: job.last_date,
        }
    }

    /// Overwrite fields present in `input`, then re-run validation
    pub fn merge(mut self, input: JobInput) -> Result<Self, String> {
        if let Some(title) = input.title {
            self.title = title;
        }
        if let Some(description) = input.description {
            self.description = description;
        }
        if let Some(email) = input.email {
            self.email = email;
        }
        if let Some(address) = input.address {
            self.address = address;
        }
        if let Some(company) = input.company {
            self.company = company;
        }
        if let Some(industry) = input.industry {
            self.industry = industry;
        }
        if let Some(job_type) = input.job_type {
            self.job_type = job_type;
        }
        if let Some(min_education) = input.min_education {
            self.min_education = min_education;
        }
        if input.max_education.is_some() {
            self.max_education = input.max_education;
        }
        if let Some(positions) = input.positions {
            self.positions = positions;
        }
        if let Some(experience) = input.experience {
            self.experience = experience;
        }
        if let Some(salary) = input.salary {
            self.salary = salary;
        }
        if let Some(last_date) = input.last_date {
            self.last_date = last_date;
        }
        self.validate()?;
        Ok(self)
    }

    /// Shape and range checks that need no database
    pub fn validate(&self) -> Result<(), String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Please enter Job title.".to_string());
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(format!(
                "Job title can not exceed {} characters.",
                MAX_TITLE_LENGTH
            ));
        }
        if self.description.trim().is_empty() {
            return Err("Please enter Job description.".to_string());
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(format!(
                "Job description can not exceed {} characters.",
                MAX_DESCRIPTION_LENGTH
            ));
        }
        if !super::user::is_valid_email(&self.email) {
            return Err("Please add a valid email address.".to_string());
        }
        if self.address.trim().is_empty() {
            return Err("Please add an address.".to_string());
        }
        if self.company.trim().is_empty() {
            return Err("Please add Company name.".to_string());
        }
        if self.industry.is_empty() {
            return Err("Please enter industry for this job.".to_string());
        }
        if self.positions < 1 {
            return Err("Number of positions must be at least 1.".to_string());
        }
        if !self.salary.is_finite() || self.salary < 0.0 {
            return Err("Please enter expected salary for this job.".to_string());
        }
        if let Some(max) = self.max_education {
            if max < self.min_education {
                return Err(
                    "Maximum education can not be lower than minimum education.".to_string(),
                );
            }
        }
        Ok(())
    }
}

/// Derive a URL-safe slug: lowercase ASCII alphanumerics separated by single
/// hyphens. Titles with no usable characters fall back to `job`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '\'' {
            // apostrophes join words: "Editor's" -> "editors"
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "job".to_string()
    } else {
        slug
    }
}

/// Slug candidate for the nth attempt; the first attempt is the bare slug
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}
