mod job;
mod user;

pub use job::*;
pub use user::*;
