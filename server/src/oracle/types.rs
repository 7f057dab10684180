//! Oracle wire types and error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compositor::{Mask, MaskError};

/// Errors that can occur when asking the oracle for masks
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Mask oracle unreachable: {0}")]
    Unavailable(String),

    #[error("Mask oracle returned a bad response: {0}")]
    BadResponse(String),

    #[error("Mask oracle returned an invalid mask: {0}")]
    InvalidMask(#[from] MaskError),

    #[error("Failed to encode image for the oracle: {0}")]
    Encode(String),
}

/// One mask in the oracle's response, row-major run-length encoded.
/// The first run counts uncovered pixels; runs alternate from there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RleMask {
    /// Grid size as `[height, width]`.
    pub size: [u32; 2],
    pub counts: Vec<u32>,
    /// Covered pixel count reported by the model.
    pub area: u32,
}

/// Response body of the oracle's segment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub masks: Vec<RleMask>,
}

impl RleMask {
    pub fn decode(&self) -> Result<Mask, MaskError> {
        let [height, width] = self.size;
        Mask::from_rle(width, height, &self.counts, self.area)
    }
}
