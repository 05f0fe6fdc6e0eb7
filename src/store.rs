//! Credential Store
//!
//! External collaborator interface for user records, unique by email.
//! Creation is atomic insert-or-conflict; callers never check-then-insert,
//! so concurrent signups with the same email cannot both succeed.

use crate::models::UserRecord;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Credential store failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Unique-by-email user record storage.
///
/// Callers pass already-normalized (lowercased, trimmed) emails.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Atomically create a record; fails with [`StoreError::DuplicateEmail`]
    /// if the email is taken.
    async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;
}

// ============================================
// Postgres Store
// ============================================

/// Postgres-backed credential store
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema. The unique index on email is what makes `create`
    /// atomic under concurrent signups.
    pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
        tracing::info!("running credential store migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(100) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);")
            .execute(pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }

    fn map_create_error(err: sqlx::Error) -> StoreError {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_create_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

// ============================================
// In-Memory Store
// ============================================

/// In-memory credential store used by tests and local runs.
///
/// The duplicate check and the insert happen under one write lock, preserving
/// the insert-or-conflict contract.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(StoreError::DuplicateEmail);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.insert(email.to_string(), record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.id == id)
            .cloned())
    }
}
