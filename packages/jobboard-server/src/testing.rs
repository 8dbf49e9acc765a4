//! Fixtures shared by unit and router tests.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::models::{Education, Experience, Industry, Job, JobType, Location, Role, User};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-at-least-32-chars";

pub fn user_with_role(role: Role) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        name: format!("{} {}", role, &id.to_string()[..8]),
        email: format!("{}@example.com", id),
        password_hash: String::new(),
        role,
        created_at: Utc::now(),
    }
}

/// A valid open job owned by `owner`, located in downtown San Francisco
pub fn employer_job(owner: Uuid, title: &str) -> Job {
    let now = Utc::now();
    let id = Uuid::new_v4();
    Job {
        id,
        title: title.to_string(),
        slug: format!("{}-{}", crate::models::slugify(title), id.simple()),
        description: "Build and run things.".to_string(),
        email: "jobs@example.com".to_string(),
        address: "1 Market St, San Francisco, CA 94105".to_string(),
        location: Some(Location {
            latitude: 37.7898,
            longitude: -122.3942,
            formatted_address: "San Francisco, CA 94105, US".to_string(),
            city: Some("San Francisco".to_string()),
            state: Some("CA".to_string()),
            zipcode: Some("94105".to_string()),
            country: Some("US".to_string()),
        }),
        company: "Acme".to_string(),
        industry: vec![Industry::InformationTechnology],
        job_type: JobType::Permanent,
        min_education: Education::Bachelors,
        max_education: None,
        positions: 1,
        experience: Experience::OneToTwoYears,
        salary: 100_000.0,
        posting_date: now,
        last_date: now + Duration::days(7),
        applied: false,
        user: owner,
    }
}
