//! Token Issuance
//!
//! Mints and verifies the two token classes. Each class has its own secret
//! and lifetime; a token signed for one class never verifies as the other.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{Claims, TokenPair};

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

/// Token class selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Verification failures, mapped from the JWT library
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
}

struct KeySet {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl KeySet {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }
}

/// Issues and verifies signed, expiring tokens
pub struct TokenIssuer {
    access: KeySet,
    refresh: KeySet,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: KeySet::new(&config.access_secret, config.access_ttl_secs),
            refresh: KeySet::new(&config.refresh_secret, config.refresh_ttl_secs),
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeySet {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Issue a token of the given class, stamping iat and exp
    pub fn issue(&self, kind: TokenKind, sub: Uuid, email: &str) -> Result<String, AuthError> {
        let keys = self.keys(kind);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub,
            email: email.to_string(),
            iat: now,
            exp: now + keys.ttl_secs,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding)?;
        Ok(token)
    }

    /// Issue an access/refresh pair; the two are never minted individually
    pub fn issue_pair(&self, sub: Uuid, email: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, sub, email)?,
            refresh_token: self.issue(TokenKind::Refresh, sub, email)?,
        })
    }

    /// Verify a token against one class's secret and expiry
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // A token is valid until its exp, not a minute past it
        validation.leeway = 0;

        decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}
