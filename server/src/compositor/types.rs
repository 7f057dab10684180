//! Mask type shared between the oracle client and the compositor.

use thiserror::Error;

/// Errors raised while constructing a mask from oracle output
#[derive(Debug, Error)]
pub enum MaskError {
    #[error("mask pixel buffer has {got} entries, expected {expected} for {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },

    #[error("run-length counts sum to {got}, expected {expected} for {width}x{height}")]
    RunLengthOverflow {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
}

/// One segmented region: a boolean per-pixel membership grid plus its area
/// in pixels. Produced by the mask oracle per request, never persisted.
#[derive(Debug, Clone)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    /// Row-major membership grid, `width * height` entries.
    pixels: Vec<bool>,
    /// Pixel count as reported by the oracle; drives paint order.
    pub area: u32,
}

impl Mask {
    pub fn new(width: u32, height: u32, pixels: Vec<bool>, area: u32) -> Result<Self, MaskError> {
        let expected = (width as usize) * (height as usize);
        if pixels.len() != expected {
            return Err(MaskError::SizeMismatch {
                width,
                height,
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            area,
        })
    }

    /// Decode a row-major run-length encoding where the first run counts
    /// uncovered pixels and runs alternate covered/uncovered from there.
    pub fn from_rle(width: u32, height: u32, counts: &[u32], area: u32) -> Result<Self, MaskError> {
        let expected = (width as usize) * (height as usize);
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total != expected {
            return Err(MaskError::RunLengthOverflow {
                width,
                height,
                expected,
                got: total,
            });
        }

        let mut pixels = Vec::with_capacity(expected);
        let mut value = false;
        for &run in counts {
            pixels.extend(std::iter::repeat_n(value, run as usize));
            value = !value;
        }
        Self::new(width, height, pixels, area)
    }

    /// Membership test; out-of-range coordinates are simply not covered.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    /// Number of covered pixels in the grid (may differ from the oracle's
    /// reported `area`; the reported value is authoritative for ordering).
    pub fn covered_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }
}
