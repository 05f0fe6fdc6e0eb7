//! Authentication Extractors
//!
//! The two verification strategies of the HTTP boundary, both backed by
//! [`crate::token::TokenIssuer::verify`]: [`AuthUser`] reads the bearer
//! access token, [`RefreshClaims`] reads the refresh token strictly from its
//! cookie. Which strategy applies is declared per route, never inspected at
//! runtime.

use crate::error::AuthError;
use crate::handlers::REFRESH_COOKIE_NAME;
use crate::middleware::bearer_claims;
use crate::models::Claims;
use crate::token::TokenKind;
use crate::AppState;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

/// Authenticated user identity from a verified access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

impl AuthUser {
    fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Claims already validated by the require_auth layer, if present
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AuthUser::from_claims(claims));
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let claims = bearer_claims(state, auth_header)?;
        Ok(AuthUser::from_claims(&claims))
    }
}

/// Verified refresh-token claims, extracted from the `refresh_token` cookie.
///
/// This is the only path into [`crate::service::AuthService::refresh`];
/// refresh tokens in headers or bodies are never accepted.
#[derive(Debug, Clone)]
pub struct RefreshClaims(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for RefreshClaims {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(REFRESH_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .ok_or(AuthError::Unauthenticated)?;

        let claims = state.auth.tokens().verify(&token, TokenKind::Refresh)?;
        Ok(RefreshClaims(claims))
    }
}
