//! Auth types and error definitions

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during authentication and permission checks
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Wrong username or password")]
    InvalidCredentials,

    #[error("Username already exists!")]
    UsernameTaken,

    #[error("Role {0} not found!")]
    RoleNotFound(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("You need to be a {required} role to do that")]
    PermissionDenied { required: &'static str },

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// JSON error envelope for auth failures
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<AuthError> for AuthErrorResponse {
    fn from(e: AuthError) -> Self {
        let code = match &e {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UsernameTaken => "username_taken",
            AuthError::RoleNotFound(_) => "role_not_found",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::PermissionDenied { .. } => "permission_denied",
            AuthError::Hash(_) | AuthError::Token(_) => "auth_internal",
            AuthError::Db(_) => "db_error",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for AuthErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "invalid_credentials" | "unauthenticated" => StatusCode::UNAUTHORIZED,
            "permission_denied" => StatusCode::FORBIDDEN,
            "username_taken" | "role_not_found" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AuthErrorResponse::from(self).into_response()
    }
}

/// Bearer token claims carried through request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub username: String,
    pub roles: Vec<String>,
    /// Expiry as unix seconds
    pub exp: usize,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Role to attach at registration (`admin` or `user`).
    pub role: String,
}

/// Response for successful login / registration
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub roles: Vec<String>,
}
