//! Authentication routes: register, login, refresh, logout and session
//! management.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use tracing::info;
use upwatch_core::auth::ContactDetails;
use upwatch_shared::TokenPair;
use upwatch_shared::auth::{
    LoginRequest, LogoutAllResponse, LogoutRequest, RefreshRequest, RegisterRequest, SessionInfo,
};
use validator::Validate;

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

/// Routes that need no access token.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

/// Routes behind the bearer-token middleware.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/sessions", get(list_sessions))
        .route("/auth/account", delete(delete_account))
}

/// POST /auth/register - Register a new user and open a session.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenPair>), ApiError> {
    payload.validate()?;

    let contact = ContactDetails {
        email: payload.email,
        contact_id: payload.contact_id,
    };
    let tokens = state
        .auth
        .register(
            &payload.username,
            &payload.password,
            contact,
            &payload.fingerprint,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(tokens)))
}

/// POST /auth/login - Authenticate user and return tokens.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    payload.validate()?;

    let tokens = state
        .auth
        .login(&payload.username, &payload.password, &payload.fingerprint)
        .await?;

    Ok(Json(tokens))
}

/// POST /auth/refresh - Exchange a refresh token for a new pair.
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    payload.validate()?;

    let tokens = state
        .auth
        .refresh(&payload.refresh_token, &payload.fingerprint)
        .await?;

    Ok(Json(tokens))
}

/// POST /auth/logout - End the session behind a refresh token.
async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<LogoutRequest>,
) -> Result<StatusCode, ApiError> {
    payload.validate()?;

    state
        .auth
        .logout(user.user_id(), &payload.refresh_token, &payload.fingerprint)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout-all - End every session of the caller.
async fn logout_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<LogoutAllResponse>, ApiError> {
    let revoked = state.auth.logout_all(user.user_id()).await?;

    info!(user_id = %user.user_id(), revoked, "Logged out everywhere");
    Ok(Json(LogoutAllResponse { revoked }))
}

/// GET /auth/sessions - List the caller's live sessions.
async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionInfo>>, ApiError> {
    let sessions = state.auth.list_sessions(user.user_id()).await?;
    Ok(Json(sessions))
}

/// DELETE /auth/account - Delete the caller and all their sessions.
async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, ApiError> {
    state.auth.delete_account(user.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
