//! HTTP-backed mask oracle
//!
//! Talks to an external model server (SAM or compatible) that accepts a PNG
//! body on `POST /segment` and answers with run-length encoded masks.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::compositor::Mask;

use super::service::MaskOracle;
use super::types::{OracleError, SegmentResponse};

/// Mask oracle served by an external HTTP model server.
pub struct RemoteMaskOracle {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteMaskOracle {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl MaskOracle for RemoteMaskOracle {
    async fn generate(&self, image: &RgbImage) -> Result<Vec<Mask>, OracleError> {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| OracleError::Encode(e.to_string()))?;

        debug!(
            "Requesting masks for {}x{} image ({} bytes)",
            image.width(),
            image.height(),
            png.len()
        );

        let response = self
            .client
            .post(self.endpoint("segment"))
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png)
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OracleError::BadResponse(format!(
                "status {}",
                response.status()
            )));
        }

        let body: SegmentResponse = response
            .json()
            .await
            .map_err(|e| OracleError::BadResponse(e.to_string()))?;

        debug!("Oracle returned {} masks", body.masks.len());

        body.masks
            .iter()
            .map(|m| m.decode().map_err(OracleError::from))
            .collect()
    }

    async fn ping(&self) -> Result<(), OracleError> {
        self.client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| OracleError::BadResponse(e.to_string()))?;
        Ok(())
    }
}
