use std::sync::Arc;
use std::time::Instant;

use crate::auth::TokenIssuer;
use crate::config::ServerConfig;
use crate::geo::Geocoder;
use crate::storage::{JobStore, ResumeStore, UserStore};

/// Main server state shared across all handlers
pub struct ServerState {
    pub config: ServerConfig,
    pub user_store: Arc<dyn UserStore>,
    pub job_store: Arc<dyn JobStore>,
    pub resumes: Arc<dyn ResumeStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub tokens: TokenIssuer,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        user_store: Arc<dyn UserStore>,
        job_store: Arc<dyn JobStore>,
        resumes: Arc<dyn ResumeStore>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let tokens = TokenIssuer::new(
            &config.jwt_secret,
            chrono::Duration::hours(config.jwt_expires_hours),
            config.cookie_expires_days,
            config.is_production(),
        );

        Self {
            config,
            user_store,
            job_store,
            resumes,
            geocoder,
            tokens,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
