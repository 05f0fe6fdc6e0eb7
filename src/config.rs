//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use std::env;

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret for signing access tokens (from JWT_ACCESS_SECRET env var)
    pub access_secret: String,

    /// Secret for signing refresh tokens (from JWT_REFRESH_SECRET env var)
    pub refresh_secret: String,

    /// Access token lifetime in seconds (from ACCESS_TOKEN_TTL_SECS env var)
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds (from REFRESH_TOKEN_TTL_SECS env var)
    pub refresh_ttl_secs: i64,

    /// Credential store connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// Server bind address (from BIND_ADDR env var)
    pub bind_addr: String,

    /// Allowed CORS origins, comma separated (from CORS_ORIGINS env var)
    pub cors_origins: Vec<String>,

    /// Set the Secure attribute on the refresh cookie (from COOKIE_SECURE env var)
    pub cookie_secure: bool,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Timeout for credential store calls in seconds (from STORE_TIMEOUT_SECS env var)
    pub store_timeout_secs: u64,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            access_secret: env::var("JWT_ACCESS_SECRET").map_err(|_| {
                AuthError::Config("JWT_ACCESS_SECRET environment variable must be set".into())
            })?,

            refresh_secret: env::var("JWT_REFRESH_SECRET").map_err(|_| {
                AuthError::Config("JWT_REFRESH_SECRET environment variable must be set".into())
            })?,

            access_ttl_secs: env::var("ACCESS_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900), // 15 minutes default

            refresh_ttl_secs: env::var("REFRESH_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(604800), // 7 days default

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/authkit".to_string()),

            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),

            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            cookie_secure: env::var("COOKIE_SECURE")
                .ok()
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),

            argon2_memory_cost: env::var("ARGON2_MEMORY_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(65536), // 64 MiB

            argon2_time_cost: env::var("ARGON2_TIME_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),

            argon2_parallelism: env::var("ARGON2_PARALLELISM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),

            store_timeout_secs: env::var("STORE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_ACCESS_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.refresh_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_REFRESH_SECRET must be at least 32 characters".to_string(),
            ));
        }

        // Compromise of one secret must not forge the other token class
        if self.access_secret == self.refresh_secret {
            return Err(AuthError::Config(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
            ));
        }

        if self.access_ttl_secs <= 0 {
            return Err(AuthError::Config(
                "ACCESS_TOKEN_TTL_SECS must be positive".to_string(),
            ));
        }

        if self.refresh_ttl_secs <= self.access_ttl_secs {
            return Err(AuthError::Config(
                "REFRESH_TOKEN_TTL_SECS must be greater than ACCESS_TOKEN_TTL_SECS".to_string(),
            ));
        }

        Ok(())
    }
}
