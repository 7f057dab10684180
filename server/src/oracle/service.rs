//! MaskOracle trait definition

use async_trait::async_trait;
use image::RgbImage;

use crate::compositor::Mask;

use super::types::OracleError;

/// Trait for mask oracles (remote model server, or a test double)
#[async_trait]
pub trait MaskOracle: Send + Sync {
    /// Run segmentation over an RGB image and return its masks.
    ///
    /// An empty vector is a valid answer; the lifecycle layer decides
    /// whether that is an error for its caller.
    async fn generate(&self, image: &RgbImage) -> Result<Vec<Mask>, OracleError>;

    /// Probe whether the oracle is reachable. Used once at startup.
    async fn ping(&self) -> Result<(), OracleError> {
        Ok(())
    }
}
