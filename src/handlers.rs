//! Authentication HTTP Handlers
//!
//! REST endpoints for signup, signin, refresh, logout and the current-user
//! profile, plus the refresh-cookie contract.

use crate::error::AuthError;
use crate::extractors::{AuthUser, RefreshClaims};
use crate::middleware;
use crate::models::*;
use crate::AppState;

use axum::{
    extract::State,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{cookie::Cookie, CookieJar};
use validator::Validate;

/// Cookie carrying the refresh token
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// The cookie is scoped to the refresh route; it is never sent anywhere else.
/// Logout must clear with this exact name and path or browsers keep it.
pub const REFRESH_COOKIE_PATH: &str = "/auth/refresh";

// ============================================
// Route Builder
// ============================================

/// Create the authentication routes
pub fn create_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout));

    let protected = Router::new()
        .route("/users/me", get(me))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new().merge(public).merge(protected).with_state(state)
}

// ============================================
// Refresh Cookie
// ============================================

fn refresh_cookie(token: &str, state: &AppState) -> Result<Cookie<'static>, AuthError> {
    let mut attrs = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path={}; Max-Age={}",
        REFRESH_COOKIE_NAME, token, REFRESH_COOKIE_PATH, state.config.refresh_ttl_secs
    );
    if state.config.cookie_secure {
        attrs.push_str("; Secure");
    }
    Cookie::parse(attrs).map_err(|_| AuthError::Internal)
}

fn clear_refresh_cookie() -> Result<Cookie<'static>, AuthError> {
    Cookie::parse(format!(
        "{}=; HttpOnly; SameSite=Lax; Path={}; Max-Age=0",
        REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH
    ))
    .map_err(|_| AuthError::Internal)
}

// ============================================
// Signup / Signin
// ============================================

/// POST /auth/signup
///
/// Create an account and establish a session
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let (user, tokens) = state.auth.signup(&req.email, &req.name, &req.password).await?;

    let jar = jar.add(refresh_cookie(&tokens.refresh_token, &state)?);
    Ok((
        jar,
        Json(AuthResponse {
            user,
            access_token: tokens.access_token,
        }),
    ))
}

/// POST /auth/signin
///
/// Verify credentials and establish a session
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let (user, tokens) = state.auth.signin(&req.email, &req.password).await?;

    let jar = jar.add(refresh_cookie(&tokens.refresh_token, &state)?);
    Ok((
        jar,
        Json(AuthResponse {
            user,
            access_token: tokens.access_token,
        }),
    ))
}

// ============================================
// Refresh / Logout
// ============================================

/// POST /auth/refresh
///
/// Rotate the refresh token and mint a new access token. The incoming token
/// was already verified by the [`RefreshClaims`] cookie guard.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    RefreshClaims(claims): RefreshClaims,
) -> Result<impl IntoResponse, AuthError> {
    let tokens = state.auth.refresh(claims.sub, &claims.email).await?;

    let jar = jar.add(refresh_cookie(&tokens.refresh_token, &state)?);
    Ok((
        jar,
        Json(RefreshResponse {
            access_token: tokens.access_token,
        }),
    ))
}

/// POST /auth/logout
///
/// Clear the refresh cookie. Tokens are stateless, so there is no server
/// session to tear down.
pub async fn logout(jar: CookieJar) -> Result<impl IntoResponse, AuthError> {
    let jar = jar.add(clear_refresh_cookie()?);
    Ok((jar, Json(MessageResponse::new("Logged out"))))
}

// ============================================
// Profile
// ============================================

/// GET /users/me
///
/// Current user profile, without the password hash
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, AuthError> {
    let profile = state.auth.profile(user.id).await?;
    Ok(Json(profile))
}
