use std::env;
use std::path::PathBuf;

/// Minimum length of the token signing secret
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

pub const DEFAULT_GEOCODER_URL: &str = "https://www.mapquestapi.com";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind address (0.0.0.0 for all interfaces, 127.0.0.1 for localhost)
    pub bind_addr: String,
    /// PostgreSQL database URL
    pub database_url: String,
    /// Deployment environment; `production` hides internal error details
    pub environment: String,
    /// HS256 secret for session tokens
    pub jwt_secret: String,
    /// Session token lifetime in hours
    pub jwt_expires_hours: i64,
    /// Session cookie lifetime in days
    pub cookie_expires_days: i64,
    /// Directory for uploaded resumes
    pub upload_directory: PathBuf,
    /// Maximum resume size in bytes
    pub max_upload_size: usize,
    /// MapQuest API key; radius search and job creation fail without it
    pub geocoder_api_key: Option<String>,
    pub geocoder_url: String,
    /// Serve job read routes without authentication
    pub public_job_reads: bool,
    /// CORS allowed origins (comma-separated in env var)
    pub cors_origins: Vec<String>,
}

fn flag(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}"))),
        None => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // No defaults for secrets or the database
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort)?,
            None => 4000,
        };

        let jwt_expires_hours = parse_or(lookup("JWT_EXPIRES_HOURS"), "JWT_EXPIRES_HOURS", 168)?;
        let cookie_expires_days =
            parse_or(lookup("COOKIE_EXPIRES_DAYS"), "COOKIE_EXPIRES_DAYS", 7)?;
        if jwt_expires_hours <= 0 || cookie_expires_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "token and cookie lifetimes must be positive".to_string(),
            ));
        }

        Ok(Self {
            port,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            database_url,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            jwt_secret,
            jwt_expires_hours,
            cookie_expires_days,
            upload_directory: lookup("UPLOAD_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./public/uploads")),
            max_upload_size: parse_or(lookup("MAX_UPLOAD_SIZE"), "MAX_UPLOAD_SIZE", 2_000_000)?,
            geocoder_api_key: lookup("GEOCODER_API_KEY").filter(|k| !k.is_empty()),
            geocoder_url: lookup("GEOCODER_URL")
                .unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string()),
            public_job_reads: flag(lookup("PUBLIC_JOB_READS")),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]),
        })
    }

    /// Get the full bind address (addr:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "an-adequately-long-signing-secret-value";

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/jobs"), ("JWT_SECRET", SECRET)])
            .unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.bind_address(), "0.0.0.0:4000");
        assert_eq!(config.jwt_expires_hours, 168);
        assert_eq!(config.cookie_expires_days, 7);
        assert_eq!(config.max_upload_size, 2_000_000);
        assert_eq!(config.upload_directory, PathBuf::from("./public/uploads"));
        assert!(!config.public_job_reads);
        assert!(!config.is_production());
        assert!(config.geocoder_api_key.is_none());
    }

    #[test]
    fn test_missing_required() {
        assert!(matches!(
            load(&[("JWT_SECRET", SECRET)]),
            Err(ConfigError::MissingEnvVar(var)) if var == "DATABASE_URL"
        ));
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://x")]),
            Err(ConfigError::MissingEnvVar(var)) if var == "JWT_SECRET"
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "short")]),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", SECRET),
            ("PORT", "8081"),
            ("ENVIRONMENT", "production"),
            ("PUBLIC_JOB_READS", "true"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("MAX_UPLOAD_SIZE", "1024"),
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert!(config.is_production());
        assert!(config.public_job_reads);
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.max_upload_size, 1024);
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", SECRET), ("PORT", "http")]),
            Err(ConfigError::InvalidPort)
        ));
    }
}
