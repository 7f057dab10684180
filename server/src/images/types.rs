//! Image lifecycle types and error definitions

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::OracleError;
use crate::store::StoreError;

/// Errors that can occur in the image lifecycle
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image not found")]
    NotFound,

    #[error("File not found")]
    FileNotFound,

    #[error("Error opening image file: {0}")]
    Decode(String),

    #[error("No masks generated")]
    NoMasks,

    #[error("No file provided")]
    NoFileProvided,

    #[error("Invalid upload: {0}")]
    BadUpload(String),

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl From<StoreError> for ImageError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ImageError::FileNotFound,
            other => ImageError::Store(other),
        }
    }
}

/// JSON error envelope for the image API
#[derive(Debug, Serialize)]
pub struct ImageErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<ImageError> for ImageErrorResponse {
    fn from(e: ImageError) -> Self {
        let code = match &e {
            ImageError::NotFound => "not_found",
            ImageError::FileNotFound => "file_not_found",
            ImageError::Decode(_) => "decode_error",
            ImageError::NoMasks => "no_masks",
            ImageError::NoFileProvided | ImageError::BadUpload(_) => "bad_upload",
            ImageError::Store(_) => "store_error",
            ImageError::Oracle(_) => "oracle_error",
            ImageError::Db(_) => "db_error",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for ImageErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "not_found" | "file_not_found" => StatusCode::NOT_FOUND,
            "bad_upload" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for ImageError {
    fn into_response(self) -> Response {
        ImageErrorResponse::from(self).into_response()
    }
}

/// Summary of an image and its current overlay, for reads and listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: i64,
    /// Stored filename of the original upload.
    pub original: String,
    /// Stored filename of the latest overlay, if one was produced.
    pub segmented: Option<String>,
}

/// Response for a successful upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub active: bool,
}

/// Response for a successful segmentation run
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplySegmentationResponse {
    #[serde(rename = "processedUrl")]
    pub processed_url: String,
    pub num_segments: i64,
}
