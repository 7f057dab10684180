//! Authentication and role checks
//!
//! This module provides:
//! - `TokenManager` issuing and verifying bearer tokens for sessions
//! - argon2 password hashing helpers
//! - axum middleware guards replacing per-route permission decorators
//! - HTTP routes for register / login / logout

mod guard;
mod password;
mod routes;
mod tokens;
mod types;

pub use guard::{authenticate, require_admin, require_authenticated, require_user_or_admin};
pub use password::{hash_password, verify_password};
pub use routes::auth_routes;
pub use tokens::TokenManager;
pub use types::{AuthError, Claims, LoginRequest, RegisterRequest, SessionResponse};
