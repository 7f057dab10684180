//! Application state and router assembly

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{TokenManager, auth_routes};
use crate::config::Config;
use crate::db::Database;
use crate::images::{ImageService, image_routes};
use crate::oracle::MaskOracle;
use crate::store::ImageStore;

/// Shared application state. Every collaborator is an explicitly
/// constructed dependency so tests can swap in doubles.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub store: Arc<dyn ImageStore>,
    pub images: Arc<ImageService>,
    pub tokens: Arc<TokenManager>,
    pub public_base_url: Option<String>,
    pub max_upload_size: usize,
}

impl AppState {
    pub fn new(
        db: Database,
        store: Arc<dyn ImageStore>,
        oracle: Arc<dyn MaskOracle>,
        tokens: Arc<TokenManager>,
        config: &Config,
    ) -> Self {
        let images = Arc::new(ImageService::new(
            db.clone(),
            store.clone(),
            oracle,
            config.images.max_images,
        ));
        Self {
            db,
            store,
            images,
            tokens,
            public_base_url: config.public_base_url.clone(),
            max_upload_size: config.images.max_upload_size,
        }
    }

    /// Public URL for a stored file, absolute when a base URL is set.
    pub fn file_url(&self, filename: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/uploads/{}", base.trim_end_matches('/'), filename),
            None => format!("/uploads/{filename}"),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(auth_routes(state.clone()))
        .merge(image_routes(state))
        .layer(cors)
}
