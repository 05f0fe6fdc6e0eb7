//! Authentication Service
//!
//! Orchestrates signup, signin and token refresh over the credential store,
//! password hasher and token issuer. Owns the rotation policy and maps store
//! outcomes to error kinds.

use crate::error::AuthError;
use crate::models::{TokenPair, UserResponse};
use crate::password::PasswordHasher;
use crate::store::{CredentialStore, StoreError};
use crate::token::TokenIssuer;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Authentication service
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            store_timeout,
        }
    }

    /// Token issuer, shared with the boundary guards
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Emails are unique case-insensitively; normalize before any store call
    fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Password complexity policy: at least 8 characters with one letter,
    /// one digit and one symbol
    pub fn validate_password(password: &str) -> Result<(), AuthError> {
        let has_letter = password.chars().any(|c| c.is_alphabetic());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_symbol = password.chars().any(|c| !c.is_alphanumeric());

        if password.len() < 8 || !has_letter || !has_digit || !has_symbol {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters and include a letter, number, and special character".to_string(),
            ));
        }
        Ok(())
    }

    /// Run a store call under the configured timeout; an elapsed timeout is
    /// an internal failure, never a hung request.
    async fn with_store<T, F>(&self, op: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => {
                tracing::error!("credential store call timed out");
                Err(AuthError::Internal)
            }
        }
    }

    // ============================================
    // Signup
    // ============================================

    pub async fn signup(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<(UserResponse, TokenPair), AuthError> {
        Self::validate_password(password)?;
        let email = Self::normalize_email(email);

        let password_hash = self.hasher.hash_blocking(password.to_string()).await?;

        let user = match self
            .with_store(self.store.create(&email, name, &password_hash))
            .await
        {
            Ok(user) => user,
            Err(AuthError::EmailTaken) => {
                tracing::warn!(email = %email, "signup.duplicate_email");
                return Err(AuthError::EmailTaken);
            }
            Err(e) => {
                tracing::error!(email = %email, error = %e, "signup.error");
                return Err(e);
            }
        };

        let tokens = self.tokens.issue_pair(user.id, &user.email)?;
        tracing::info!(user_id = %user.id, email = %user.email, "signup.success");
        Ok((UserResponse::from(user), tokens))
    }

    // ============================================
    // Signin
    // ============================================

    pub async fn signin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(UserResponse, TokenPair), AuthError> {
        let email = Self::normalize_email(email);
        tracing::debug!(email = %email, "signin.attempt");

        let user = self.with_store(self.store.find_by_email(&email)).await?;

        let Some(user) = user else {
            // Burn one verification against the dummy hash so the absent-user
            // path costs the same as a wrong password.
            let _ = self
                .hasher
                .verify_blocking(self.hasher.dummy_hash().to_string(), password.to_string())
                .await;
            tracing::warn!(email = %email, "signin.failed.invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        };

        let ok = self
            .hasher
            .verify_blocking(user.password_hash.clone(), password.to_string())
            .await?;
        if !ok {
            tracing::warn!(user_id = %user.id, email = %email, "signin.failed.invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.tokens.issue_pair(user.id, &user.email)?;
        tracing::info!(user_id = %user.id, "signin.success");
        Ok((UserResponse::from(user), tokens))
    }

    // ============================================
    // Refresh
    // ============================================

    /// Unconditionally issue a fresh pair (rotation). Called only after the
    /// refresh guard has verified the incoming token and extracted its claims.
    pub async fn refresh(&self, sub: Uuid, email: &str) -> Result<TokenPair, AuthError> {
        tracing::debug!(user_id = %sub, "refresh.attempt");
        let tokens = self.tokens.issue_pair(sub, email)?;
        tracing::info!(user_id = %sub, "refresh.success");
        Ok(tokens)
    }

    // ============================================
    // Profile
    // ============================================

    /// Fetch the stored profile behind the access guard
    pub async fn profile(&self, sub: Uuid) -> Result<UserResponse, AuthError> {
        let user = self
            .with_store(self.store.find_by_id(sub))
            .await?
            .ok_or(AuthError::Unauthenticated)?;
        Ok(UserResponse::from(user))
    }
}
