//! Image byte storage
//!
//! This module provides:
//! - `ImageStore` trait for abstracting where image bytes live
//! - `LocalImageStore` for filesystem-backed storage
//!
//! Keys are slash-separated relative paths (`uploads/<name>`,
//! `segments/<name>`); the lifecycle service decides the namespace.

mod local;
mod service;
mod types;

pub use local::LocalImageStore;
pub use service::ImageStore;
pub use types::StoreError;
