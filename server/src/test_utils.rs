//! Test Utilities Module
//!
//! Provides helper functions, fixtures, and doubles for testing the SegView
//! server. This module is only compiled when running tests.

#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use image::RgbImage;
use serde::de::DeserializeOwned;
use tower::util::ServiceExt;

use crate::auth::{TokenManager, hash_password};
use crate::compositor::Mask;
use crate::config::Config;
use crate::db::Database;
use crate::oracle::{MaskOracle, OracleError};
use crate::server::{AppState, build_router};
use crate::store::LocalImageStore;

// ============================================================================
// Fake Oracle
// ============================================================================

/// Mask oracle double producing a fixed number of nested rectangle masks
/// sized to whatever image it is given.
pub struct FakeOracle {
    pub mask_count: usize,
}

impl FakeOracle {
    pub fn new(mask_count: usize) -> Self {
        Self { mask_count }
    }
}

#[async_trait]
impl MaskOracle for FakeOracle {
    async fn generate(&self, image: &RgbImage) -> Result<Vec<Mask>, OracleError> {
        Ok(nested_masks(image.width(), image.height(), self.mask_count))
    }
}

/// Build `count` nested rectangle masks with strictly decreasing areas.
pub fn nested_masks(width: u32, height: u32, count: usize) -> Vec<Mask> {
    (0..count)
        .map(|i| {
            let w = (width - (i as u32).min(width - 1)).max(1);
            let h = (height - (i as u32).min(height - 1)).max(1);
            let mut pixels = vec![false; (width * height) as usize];
            for y in 0..h {
                for x in 0..w {
                    pixels[(y * width + x) as usize] = true;
                }
            }
            Mask::new(width, height, pixels, w * h).unwrap()
        })
        .collect()
}

/// Encode a small solid-color PNG for upload fixtures.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([90, 120, 150]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut out),
            image::ImageFormat::Png,
        )
        .expect("encode test png");
    out
}

/// Assemble a single-field multipart/form-data body.
pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "segview-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

// ============================================================================
// Test Context
// ============================================================================

/// Test context holding the app state and a router over real collaborators
/// (in-memory metadata store, temp-dir byte store, fake oracle).
pub struct TestContext {
    pub state: AppState,
    pub router: Router,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_oracle(Arc::new(FakeOracle::new(3))).await
    }

    pub async fn with_oracle(oracle: Arc<dyn MaskOracle>) -> Self {
        let db = Database::connect_in_memory().await.expect("connect db");
        db.init_schema().await.expect("init schema");
        db.seed_roles().await.expect("seed roles");

        let dir = std::env::temp_dir().join(format!("segview-test-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(LocalImageStore::new(dir).expect("create store"));

        let tokens = Arc::new(TokenManager::new(
            "test-secret",
            std::time::Duration::from_secs(3600),
        ));

        let config = Config::default();
        let state = AppState::new(db, store, oracle, tokens, &config);
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Create a user with one role and return a bearer token for them.
    pub async fn user_token(&self, username: &str, role: &str) -> String {
        let role_row = self
            .state
            .db
            .find_role(role)
            .await
            .expect("find role")
            .expect("role exists");
        let hash = hash_password("password").expect("hash");
        let user = self
            .state
            .db
            .create_user(username, &hash, &[role_row.id])
            .await
            .expect("create user");
        self.state
            .tokens
            .issue(user.id, username, vec![role.to_string()])
            .expect("issue token")
    }

    /// Make an HTTP request to the test router
    pub async fn request(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request")
    }

    /// Make a GET request and parse the JSON response
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        uri: &str,
        token: Option<&str>,
    ) -> (StatusCode, Option<T>) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let response = self
            .request(builder.body(Body::empty()).expect("build request"))
            .await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).ok())
    }

    /// Make a POST request with a JSON body and parse the JSON response
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        uri: &str,
        body: impl serde::Serialize,
        token: Option<&str>,
    ) -> (StatusCode, Option<T>) {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let response = self
            .request(builder.body(Body::from(bytes)).expect("build request"))
            .await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).ok())
    }

    /// Upload a file through the multipart endpoint
    pub async fn upload<T: DeserializeOwned>(
        &self,
        filename: &str,
        bytes: &[u8],
        token: Option<&str>,
    ) -> (StatusCode, Option<T>) {
        let (content_type, body) = multipart_body("image", filename, bytes);
        let mut builder = Request::builder()
            .method("POST")
            .uri("/upload")
            .header("Content-Type", content_type);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let response = self
            .request(builder.body(Body::from(body)).expect("build request"))
            .await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).ok())
    }
}

// ============================================================================
// Tests for Test Utilities
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn context_serves_health() {
        let ctx = TestContext::new().await;
        let (status, body) = ctx.get_json::<Value>("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["status"], "ok");
    }

    #[tokio::test]
    async fn anonymous_upload_is_denied_with_role_message() {
        let ctx = TestContext::new().await;
        let (status, body) = ctx
            .upload::<Value>("cat.png", &png_bytes(4, 4), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body.unwrap()["error"],
            "You need to be a user role to do that"
        );
    }

    #[tokio::test]
    async fn user_token_can_upload() {
        let ctx = TestContext::new().await;
        let token = ctx.user_token("uploader", "user").await;
        let (status, body) = ctx
            .upload::<Value>("cat.png", &png_bytes(4, 4), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert!(body["filename"].as_str().unwrap().ends_with("cat.png"));
        assert_eq!(body["active"], true);
    }

    #[tokio::test]
    async fn register_endpoint_hands_out_a_working_token() {
        let ctx = TestContext::new().await;
        let (status, body) = ctx
            .post_json::<Value>(
                "/register",
                serde_json::json!({"username": "fresh", "password": "pw", "role": "user"}),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = body.unwrap()["token"].as_str().unwrap().to_string();

        let (status, _) = ctx
            .upload::<Value>("cat.png", &png_bytes(4, 4), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn nested_masks_have_decreasing_area() {
        let masks = nested_masks(8, 8, 3);
        assert_eq!(masks.len(), 3);
        assert!(masks[0].area > masks[1].area);
        assert!(masks[1].area > masks[2].area);
    }
}
