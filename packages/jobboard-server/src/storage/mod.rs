mod jobs;
#[cfg(test)]
mod memory;
pub mod query;
mod resumes;
mod traits;
mod users;

pub use jobs::PostgresJobStore;
#[cfg(test)]
pub use memory::{MemoryJobStore, MemoryResumeStore, MemoryUserStore};
pub use query::{ListQuery, QueryError};
pub use resumes::{LocalResumeStore, ResumeStore};
pub use traits::{JobStore, StorageError, StorageResult, UserStore};
pub use users::{PostgresUserStore, USER_DEFAULT_SORT, USER_FIELDS};
