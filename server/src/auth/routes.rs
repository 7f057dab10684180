//! HTTP route handlers for sessions

use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router, extract::State};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::server::AppState;

use super::guard::require_authenticated;
use super::password::{hash_password, verify_password};
use super::types::{AuthError, LoginRequest, RegisterRequest, SessionResponse};

/// POST /login - exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AuthError> {
    let user = state
        .db
        .find_user_by_username(&body.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !user.active || !verify_password(&body.password, &user.password) {
        warn!("Failed login attempt for {}", body.username);
        return Err(AuthError::InvalidCredentials);
    }

    let roles = state.db.roles_for_user(user.id).await?;
    let token = state.tokens.issue(user.id, &user.username, roles.clone())?;
    info!("User logged in: {}", user.username);

    Ok(Json(SessionResponse {
        token,
        user_id: user.id,
        username: user.username,
        roles,
    }))
}

/// POST /register - create a user with one role and log them straight in
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, AuthError> {
    if state
        .db
        .find_user_by_username(&body.username)
        .await?
        .is_some()
    {
        return Err(AuthError::UsernameTaken);
    }

    let role = state
        .db
        .find_role(&body.role)
        .await?
        .ok_or_else(|| AuthError::RoleNotFound(body.role.clone()))?;

    let hash = hash_password(&body.password)?;
    let user = state.db.create_user(&body.username, &hash, &[role.id]).await?;
    let roles = state.db.roles_for_user(user.id).await?;
    let token = state.tokens.issue(user.id, &user.username, roles.clone())?;
    info!("User registered: {} ({})", user.username, body.role);

    Ok(Json(SessionResponse {
        token,
        user_id: user.id,
        username: user.username,
        roles,
    }))
}

/// GET /logout - acknowledge the end of a session
///
/// Tokens are stateless, so logout is an acknowledgement the client pairs
/// with discarding its token.
pub async fn logout() -> Json<Value> {
    Json(json!({ "message": "You have been logged out." }))
}

/// Build session routes
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/logout",
            get(logout).route_layer(middleware::from_fn(require_authenticated)),
        )
        .route("/login", post(login))
        .route("/register", post(register))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            super::guard::authenticate,
        ))
        .with_state(state)
}
