//! SegView Server Library
//!
//! This module exports the server components for use in integration tests
//! and external tooling.

pub mod auth;
pub mod compositor;
pub mod config;
pub mod db;
pub mod images;
pub mod oracle;
pub mod server;
pub mod store;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use compositor::Mask;
pub use db::Database;
pub use images::ImageService;
pub use oracle::MaskOracle;
pub use server::{AppState, build_router};
pub use store::{ImageStore, LocalImageStore};
