//! authkit — Credential Authentication Service
//!
//! Credential-based authentication providing:
//! - User signup and signin with Argon2id password hashing
//! - Short-lived JWT access tokens and long-lived refresh tokens,
//!   each signed with its own secret
//! - Refresh token rotation through an HTTP-only, path-scoped cookie
//! - A companion client session manager with single-flight refresh
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_ACCESS_SECRET` - Access token signing secret (required, min 32 chars)
//! - `JWT_REFRESH_SECRET` - Refresh token signing secret (required, min 32 chars,
//!   must differ from the access secret)
//! - `ACCESS_TOKEN_TTL_SECS` - Access token lifetime (default: 900)
//! - `REFRESH_TOKEN_TTL_SECS` - Refresh token lifetime (default: 604800)
//! - `DATABASE_URL` - PostgreSQL connection string
//! - `BIND_ADDR` - Server bind address (default: 0.0.0.0:3000)
//! - `CORS_ORIGINS` - Comma-separated allowed origins
//! - `COOKIE_SECURE` - Set the Secure cookie attribute (default: false)
//!
//! # Usage
//!
//! ```rust,ignore
//! use authkit::{AppState, AuthService};
//!
//! let state = AppState::new(auth_service, config);
//! let app = authkit::handlers::create_routes(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use client::{SessionManager, Transport};
pub use config::AuthConfig;
pub use error::AuthError;
pub use extractors::{AuthUser, RefreshClaims};
pub use models::*;
pub use password::PasswordHasher;
pub use service::AuthService;
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
pub use token::{TokenIssuer, TokenKind};

use std::sync::Arc;

/// Shared application state for the HTTP boundary
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub config: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, config: Arc<AuthConfig>) -> Self {
        Self { auth, config }
    }
}
