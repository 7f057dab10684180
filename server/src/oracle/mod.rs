//! Mask oracle module
//!
//! The segmentation model is an external collaborator: given an RGB image it
//! returns a set of masks (membership grid + area) and nothing else. This
//! module provides:
//! - `MaskOracle` trait for abstracting the model backend
//! - `RemoteMaskOracle` for a model served over HTTP
//! - wire types for the oracle's RLE mask response

mod remote;
mod service;
mod types;

pub use remote::RemoteMaskOracle;
pub use service::MaskOracle;
pub use types::{OracleError, RleMask, SegmentResponse};
