//! Authentication Middleware
//!
//! Bearer-token access guard for protected routes. Verified claims are
//! stored in request extensions for the [`crate::extractors::AuthUser`]
//! extractor.

use crate::error::AuthError;
use crate::models::Claims;
use crate::token::TokenKind;
use crate::AppState;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

/// Extract and verify the bearer token from an Authorization header value
pub(crate) fn bearer_claims(state: &AppState, header: Option<&str>) -> Result<Claims, AuthError> {
    let header = header.ok_or(AuthError::Unauthenticated)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Unauthenticated)?;

    state
        .auth
        .tokens()
        .verify(token, TokenKind::Access)
        .map_err(AuthError::from)
}

/// Require a valid access token.
///
/// Rejects with 401 when the header is absent, malformed, expired or carries
/// a bad signature.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let claims = bearer_claims(&state, auth_header)?;

    // Store claims in request extensions for extractors
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
