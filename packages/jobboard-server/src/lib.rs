pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::ServerState;
