//! Image lifecycle module
//!
//! This module provides:
//! - `ImageService` orchestrating upload, segmentation and deletion
//! - HTTP routes for the image API and stored-file serving
//!
//! The heavy lifting (mask painting and blending) lives in `compositor`;
//! this layer wires the stores and the oracle around it.

pub mod routes;
mod service;
mod types;

pub use routes::image_routes;
pub use service::ImageService;
pub use types::{ApplySegmentationResponse, ImageError, ImageInfo, UploadResponse};
