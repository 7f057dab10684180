//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use image::RgbImage;
use segview_server::auth::{TokenManager, hash_password};
use segview_server::compositor::Mask;
use segview_server::config::Config;
use segview_server::db::Database;
use segview_server::oracle::{MaskOracle, OracleError};
use segview_server::server::{AppState, build_router};
use segview_server::store::LocalImageStore;
use serde::de::DeserializeOwned;
use tower::util::ServiceExt;

/// Mask oracle double: a fixed number of nested rectangle masks sized to
/// the incoming image.
pub struct FakeOracle {
    pub mask_count: usize,
}

#[async_trait]
impl MaskOracle for FakeOracle {
    async fn generate(&self, image: &RgbImage) -> Result<Vec<Mask>, OracleError> {
        let (width, height) = image.dimensions();
        Ok((0..self.mask_count)
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
            .collect())
    }
}

/// A full application over test collaborators: in-memory metadata store,
/// temp-dir byte store, fake oracle.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_oracle(3).await
}

pub async fn create_test_app_with_oracle(mask_count: usize) -> TestApp {
    let db = Database::connect_in_memory().await.expect("connect db");
    db.init_schema().await.expect("init schema");
    db.seed_roles().await.expect("seed roles");

    let dir = std::env::temp_dir().join(format!("segview-it-{}", uuid::Uuid::new_v4()));
    let store = Arc::new(LocalImageStore::new(dir).expect("create store"));
    let oracle = Arc::new(FakeOracle { mask_count });
    let tokens = Arc::new(TokenManager::new("it-secret", Duration::from_secs(3600)));

    let state = AppState::new(db, store, oracle, tokens, &Config::default());
    let router = build_router(state.clone());
    TestApp { router, state }
}

impl TestApp {
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

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("execute request")
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
        token: Option<&str>,
    ) -> (StatusCode, Option<T>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(value) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&value).unwrap()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };
        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).ok())
    }

    /// Upload bytes through the multipart endpoint.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        filename: &str,
        bytes: &[u8],
        token: Option<&str>,
    ) -> (StatusCode, Option<T>) {
        let boundary = "segview-it-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            );
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let response = self
            .send(builder.body(Body::from(body)).expect("build request"))
            .await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).ok())
    }
}

/// Encode a small solid-color PNG for upload fixtures.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([40, 80, 160]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut out),
            image::ImageFormat::Png,
        )
        .expect("encode test png");
    out
}
