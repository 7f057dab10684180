//! HTTP route handlers for the image API

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router, middleware};
use serde_json::{Value, json};
use tracing::error;

use crate::auth::{authenticate, require_admin, require_user_or_admin};
use crate::server::AppState;

use super::types::{ApplySegmentationResponse, ImageError, ImageInfo, UploadResponse};

/// GET /get-image/:id - one image and its current overlay filename
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ImageInfo>, ImageError> {
    Ok(Json(state.images.get(id).await?))
}

/// GET /get-image-list - all active images
pub async fn get_image_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageInfo>>, ImageError> {
    Ok(Json(state.images.list_active().await?))
}

/// POST /upload - multipart upload with a single `image` file field
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ImageError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImageError::BadUpload(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ImageError::BadUpload(e.to_string()))?;

        let row = state.images.upload(bytes, &filename).await?;
        let url = state.file_url(&row.filename);
        return Ok(Json(UploadResponse {
            id: row.id,
            filename: row.filename,
            filepath: row.filepath,
            url,
            timestamp: row.timestamp,
            active: row.active,
        }));
    }

    Err(ImageError::NoFileProvided)
}

/// GET /apply-sam/:id - run the segmentation pipeline over an image
pub async fn apply_sam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApplySegmentationResponse>, ImageError> {
    let segment = state.images.apply_segmentation(id).await.map_err(|e| {
        error!("apply-sam failed for image {}: {}", id, e);
        e
    })?;

    let filename = segment.processed_filename.unwrap_or_default();
    Ok(Json(ApplySegmentationResponse {
        processed_url: state.file_url(&filename),
        num_segments: segment.num_segments,
    }))
}

/// DELETE /delete-image/:id - soft-delete an image and drop its bytes
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ImageError> {
    state.images.delete(id).await?;
    Ok(Json(
        json!({ "message": "Image and its segment deleted successfully" }),
    ))
}

/// Sniff the stored bytes rather than trusting the filename extension:
/// overlays keep the upload's name but are always PNG encoded.
fn content_type_of(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

/// GET /uploads/:filename - serve original or processed bytes
pub async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ImageError> {
    let bytes = state.images.stored_bytes(&filename).await?;
    let content_type = content_type_of(&bytes);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        bytes,
    )
        .into_response())
}

/// Build image API routes with their role guards
pub fn image_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/upload",
            post(upload).route_layer(middleware::from_fn(require_user_or_admin)),
        )
        .route(
            "/apply-sam/:id",
            get(apply_sam).route_layer(middleware::from_fn(require_user_or_admin)),
        )
        .route(
            "/delete-image/:id",
            delete(delete_image).route_layer(middleware::from_fn(require_admin)),
        )
        .route("/get-image/:id", get(get_image))
        .route("/get-image-list", get(get_image_list))
        .route("/uploads/:filename", get(serve_file))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(DefaultBodyLimit::max(state.max_upload_size))
        .with_state(state)
}
