//! Route guards
//!
//! The original per-route permission decorators become explicit middleware:
//! `authenticate` turns a bearer token into `Claims` in request extensions,
//! and the `require_*` guards check those claims per route. Denials name the
//! minimum role the caller is missing.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use crate::db::{ROLE_ADMIN, ROLE_USER};
use crate::server::AppState;

use super::types::{AuthError, Claims};

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the bearer token (if any) into claims for downstream guards.
/// Anonymous and invalid-token requests pass through without claims; the
/// per-route guards decide whether that is acceptable.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&request) {
        match state.tokens.verify(token) {
            Ok(claims) => {
                debug!("Authenticated request for user {}", claims.username);
                request.extensions_mut().insert(claims);
            }
            Err(e) => warn!("Rejected bearer token: {}", e),
        }
    }
    next.run(request).await
}

fn claims_of(request: &Request) -> Option<&Claims> {
    request.extensions().get::<Claims>()
}

/// Any logged-in user, regardless of role.
pub async fn require_authenticated(request: Request, next: Next) -> Result<Response, AuthError> {
    if claims_of(&request).is_none() {
        return Err(AuthError::Unauthenticated);
    }
    Ok(next.run(request).await)
}

/// Admin role only.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    match claims_of(&request) {
        Some(claims) if claims.has_role(ROLE_ADMIN) => Ok(next.run(request).await),
        _ => Err(AuthError::PermissionDenied {
            required: ROLE_ADMIN,
        }),
    }
}

/// User or admin role. The denial message names `user` as the minimum.
pub async fn require_user_or_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    match claims_of(&request) {
        Some(claims) if claims.has_role(ROLE_USER) || claims.has_role(ROLE_ADMIN) => {
            Ok(next.run(request).await)
        }
        _ => Err(AuthError::PermissionDenied { required: ROLE_USER }),
    }
}
