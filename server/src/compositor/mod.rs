//! Overlay compositor: turns a set of segmentation masks into a colored,
//! semi-transparent annotation layer and merges it with the source image.
//!
//! Everything in this module is pure image math. Mask generation, storage
//! and HTTP handling live elsewhere; the functions here only ever see pixel
//! buffers and return pixel buffers.

mod types;

pub use types::{Mask, MaskError};

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use rand::Rng;

/// Build the annotation layer for a set of masks.
///
/// Masks are painted back-to-front by descending area (stable order for
/// ties), each with an opaque random color, so a small mask sitting inside a
/// large one stays visible. Pixels covered by no mask keep alpha 0.
///
/// An empty mask set yields a fully transparent layer of the requested size.
pub fn segmentation_layer<R: Rng + ?Sized>(
    masks: &[Mask],
    width: u32,
    height: u32,
    rng: &mut R,
) -> RgbaImage {
    let mut layer = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    if masks.is_empty() {
        return layer;
    }

    let mut order: Vec<&Mask> = masks.iter().collect();
    // Stable sort: equal-area masks keep their incoming order.
    order.sort_by(|a, b| b.area.cmp(&a.area));

    for mask in order {
        let color = Rgba([
            rng.random_range(0..=255u8),
            rng.random_range(0..=255u8),
            rng.random_range(0..=255u8),
            255,
        ]);
        for y in 0..height.min(mask.height) {
            for x in 0..width.min(mask.width) {
                if mask.contains(x, y) {
                    layer.put_pixel(x, y, color);
                }
            }
        }
    }

    layer
}

/// Append a fully opaque alpha channel to an RGB image.
pub fn to_rgba(rgb: &RgbImage) -> RgbaImage {
    let mut out = RgbaImage::new(rgb.width(), rgb.height());
    for (x, y, &Rgb([r, g, b])) in rgb.enumerate_pixels() {
        out.put_pixel(x, y, Rgba([r, g, b, 255]));
    }
    out
}

/// Weighted per-channel sum of two equally sized images.
///
/// Every channel, alpha included, is blended arithmetically:
/// `clamp(round(base*base_weight + overlay*overlay_weight), 0, 255)`.
/// This is deliberately not alpha compositing — the alpha channel goes
/// through the same linear combination as the color channels, matching the
/// output bytes this service has always produced.
pub fn blend(
    base: &RgbaImage,
    overlay: &RgbaImage,
    base_weight: f32,
    overlay_weight: f32,
) -> RgbaImage {
    debug_assert_eq!(base.dimensions(), overlay.dimensions());

    let mut out = RgbaImage::new(base.width(), base.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let b = base.get_pixel(x, y);
        let o = overlay.get_pixel(x, y);
        let mut channels = [0u8; 4];
        for c in 0..4 {
            let v = f32::from(b[c]) * base_weight + f32::from(o[c]) * overlay_weight;
            channels[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        *pixel = Rgba(channels);
    }
    out
}
