//! Image lifecycle orchestration
//!
//! Upload, segmentation and deletion against the metadata store, the byte
//! store and the mask oracle. Uploads run under a per-service lock so the
//! cap check, eviction and insert cannot interleave across requests.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use image::DynamicImage;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::compositor::{blend, segmentation_layer, to_rgba};
use crate::db::{Database, ImageRow, ImageSegmentRow};
use crate::oracle::MaskOracle;
use crate::store::ImageStore;

use super::types::{ImageError, ImageInfo};

/// Weights for merging the original image with the annotation layer.
const BASE_WEIGHT: f32 = 0.7;
const OVERLAY_WEIGHT: f32 = 0.3;

fn upload_key(filename: &str) -> String {
    format!("uploads/{filename}")
}

fn segment_key(filename: &str) -> String {
    format!("segments/{filename}")
}

/// Keep the final path component and strip anything a filesystem or URL
/// would trip over.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Orchestrates the image lifecycle over its three collaborators.
pub struct ImageService {
    db: Database,
    store: Arc<dyn ImageStore>,
    oracle: Arc<dyn MaskOracle>,
    max_images: usize,
    /// Serializes the check-evict-insert sequence of `upload`.
    upload_lock: Mutex<()>,
}

impl ImageService {
    pub fn new(
        db: Database,
        store: Arc<dyn ImageStore>,
        oracle: Arc<dyn MaskOracle>,
        max_images: usize,
    ) -> Self {
        Self {
            db,
            store,
            oracle,
            max_images,
            upload_lock: Mutex::new(()),
        }
    }

    /// Store a new upload, evicting the oldest active image first if the
    /// active count has hit the cap.
    pub async fn upload(
        &self,
        bytes: Bytes,
        original_filename: &str,
    ) -> Result<ImageRow, ImageError> {
        let _guard = self.upload_lock.lock().await;

        while self.db.count_active_images().await? >= self.max_images as i64 {
            let Some(oldest) = self.db.oldest_active_image().await? else {
                break;
            };
            info!(
                "Active image cap of {} reached, evicting image {} ({})",
                self.max_images, oldest.id, oldest.filename
            );
            self.remove_image(&oldest).await?;
        }

        let timestamp = Utc::now();
        let filename = format!(
            "{}-{}",
            timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            sanitize_filename(original_filename)
        );
        let key = upload_key(&filename);

        self.store.put(&key, bytes).await?;
        let row = self.db.insert_image(&filename, &key, timestamp).await?;
        info!("Stored upload {} as image {}", filename, row.id);
        Ok(row)
    }

    /// Run the oracle over an image and persist the blended overlay,
    /// replacing any previous overlay for this image.
    pub async fn apply_segmentation(&self, image_id: i64) -> Result<ImageSegmentRow, ImageError> {
        let image = self
            .db
            .get_image(image_id)
            .await?
            .filter(|i| i.active)
            .ok_or(ImageError::NotFound)?;

        let bytes = self.store.get(&upload_key(&image.filename)).await?;
        let original = image::load_from_memory(&bytes)
            .map_err(|e| ImageError::Decode(e.to_string()))?
            .to_rgb8();

        // Latest overlay only: drop stale segment rows before regenerating.
        self.db.delete_segments_for_image(image_id).await?;

        let masks = self.oracle.generate(&original).await?;
        if masks.is_empty() {
            return Err(ImageError::NoMasks);
        }
        info!("Oracle produced {} masks for image {}", masks.len(), image_id);

        let layer = segmentation_layer(
            &masks,
            original.width(),
            original.height(),
            &mut rand::rng(),
        );
        let combined = blend(&to_rgba(&original), &layer, BASE_WEIGHT, OVERLAY_WEIGHT);

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(combined)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        let processed_filename = format!("combined-{}", image.filename);
        self.store
            .put(&segment_key(&processed_filename), Bytes::from(png))
            .await?;

        let segment = self
            .db
            .insert_segment(image_id, &processed_filename, masks.len() as i64)
            .await?;
        info!(
            "Stored overlay {} for image {}",
            processed_filename, image_id
        );
        Ok(segment)
    }

    /// Soft-delete an image and best-effort remove its bytes.
    pub async fn delete(&self, image_id: i64) -> Result<(), ImageError> {
        let image = self
            .db
            .get_image(image_id)
            .await?
            .ok_or(ImageError::NotFound)?;
        self.remove_image(&image).await
    }

    async fn remove_image(&self, image: &ImageRow) -> Result<(), ImageError> {
        self.db.soft_delete_image(image.id, Utc::now()).await?;

        // Deleting absent bytes is fine; real storage failures surface.
        if let Err(e) = self.store.delete(&upload_key(&image.filename)).await {
            warn!("Failed to remove bytes for image {}: {}", image.id, e);
            return Err(e.into());
        }

        if let Some(segment) = self.db.segment_for_image(image.id).await?
            && let Some(name) = segment.processed_filename
        {
            self.store.delete(&segment_key(&name)).await?;
        }
        Ok(())
    }

    /// Lookup of one image and its current overlay filename.
    pub async fn get(&self, image_id: i64) -> Result<ImageInfo, ImageError> {
        let image = self
            .db
            .get_image(image_id)
            .await?
            .ok_or(ImageError::NotFound)?;
        let segment = self.db.segment_for_image(image.id).await?;
        Ok(ImageInfo {
            id: image.id,
            original: image.filename,
            segmented: segment.and_then(|s| s.processed_filename),
        })
    }

    /// All active images with their current overlay filenames.
    pub async fn list_active(&self) -> Result<Vec<ImageInfo>, ImageError> {
        let mut out = Vec::new();
        for image in self.db.list_active_images().await? {
            let segment = self.db.segment_for_image(image.id).await?;
            out.push(ImageInfo {
                id: image.id,
                original: image.filename,
                segmented: segment.and_then(|s| s.processed_filename),
            });
        }
        Ok(out)
    }

    /// Fetch stored bytes for serving. Names carrying the `combined-`
    /// prefix resolve to the processed namespace, everything else to the
    /// original uploads.
    pub async fn stored_bytes(&self, filename: &str) -> Result<Bytes, ImageError> {
        let key = if filename.starts_with("combined-") {
            segment_key(filename)
        } else {
            upload_key(filename)
        };
        Ok(self.store.get(&key).await?)
    }
}
