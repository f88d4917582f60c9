//! Raster frames and segmentation masks supplied by external decoders

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bytes per RGBA pixel
pub const CHANNELS: usize = 4;

/// A decoded raster frame with a row-major RGBA8 pixel buffer
///
/// The core only ever reads frames. Operations that need a modified frame
/// (masking) return a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Create a frame, checking that the buffer matches the dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let frame = Self {
            width,
            height,
            pixels,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// A frame where every pixel has the same RGBA value
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Check the `width * height * 4 == pixels.len()` invariant
    pub fn validate(&self) -> Result<()> {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(CHANNELS));
        match expected {
            Some(len) if len == self.pixels.len() => Ok(()),
            _ => Err(Error::InvalidFrame(format!(
                "{}x{} frame needs {} bytes, buffer has {}",
                self.width,
                self.height,
                self.width as u64 * self.height as u64 * CHANNELS as u64,
                self.pixels.len()
            ))),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGBA value at column `x`, row `y`
    ///
    /// Panics if the coordinates are outside the frame.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        ]
    }

    /// Set the RGBA value at column `x`, row `y`
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.pixels[offset..offset + CHANNELS].copy_from_slice(&rgba);
    }

    /// Fail with `FrameSizeMismatch` unless `other` has the same dimensions
    pub fn ensure_same_size(&self, width: u32, height: u32) -> Result<()> {
        if self.dimensions() != (width, height) {
            return Err(Error::FrameSizeMismatch {
                expected: self.dimensions(),
                actual: (width, height),
            });
        }
        Ok(())
    }

    /// New frame whose alpha channel is multiplied by the mask
    pub fn apply_mask(&self, mask: &SegmentationMask) -> Result<Frame> {
        self.validate()?;
        mask.validate()?;
        self.ensure_same_size(mask.width, mask.height)?;

        let mut pixels = self.pixels.clone();
        for (rgba, &weight) in pixels.chunks_exact_mut(CHANNELS).zip(&mask.values) {
            let alpha = rgba[3] as f32 * weight.clamp(0.0, 1.0);
            rgba[3] = alpha.round() as u8;
        }

        Ok(Frame {
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}

/// Per-pixel foreground weights from an external segmentation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    pub width: u32,
    pub height: u32,
    /// Row-major weights in `[0, 1]`; values outside are clamped when applied
    pub values: Vec<f32>,
}

impl SegmentationMask {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let mask = Self {
            width,
            height,
            values,
        };
        mask.validate()?;
        Ok(mask)
    }

    pub fn validate(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize;
        if expected != self.values.len() {
            return Err(Error::InvalidFrame(format!(
                "{}x{} mask needs {} values, has {}",
                self.width,
                self.height,
                expected,
                self.values.len()
            )));
        }
        Ok(())
    }
}
