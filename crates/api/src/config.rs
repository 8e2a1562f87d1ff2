use sheetflow_core::env::{required, var_or};
use sheetflow_core::error::CoreError;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Every field except the JWT secret and the database URL has a default
/// suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub database_url: String,
    /// Run the completion consumer inside the API process.
    pub completion_consumer_enabled: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `DATABASE_URL`                | required                |
    /// | `COMPLETION_CONSUMER_ENABLED` | `true`                  |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Result<Self, CoreError> {
        let cors_origins = var_or("CORS_ORIGINS", "http://localhost:5173".to_string())?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: var_or("HOST", "0.0.0.0".to_string())?,
            port: var_or("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: var_or("REQUEST_TIMEOUT_SECS", 30)?,
            jwt: JwtConfig::from_env()?,
            database_url: required("DATABASE_URL")?,
            completion_consumer_enabled: var_or("COMPLETION_CONSUMER_ENABLED", true)?,
        })
    }
}
