//! Frame sampling
//!
//! Turns the pixels of a raster frame into colored points on a plane facing
//! the viewer. Pixel `(px, py)` lands at
//!
//! ```text
//! x = origin_x + (px - width / 2) / scale
//! y = origin_y + (height / 2 - py) / scale
//! z = depth
//! ```
//!
//! so image-up maps to world-up.

use capture3d_core::{Error, Frame, Point, Point3f, Result};
use serde::{Deserialize, Serialize};

/// Parameters for [`sample_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerParams {
    /// World-space x offset added to every sample
    pub origin_x: f32,
    /// World-space y offset added to every sample
    pub origin_y: f32,
    /// Pixels per world unit
    pub scale: f32,
    /// Step between sampled rows and columns; 1 samples every pixel
    pub stride: u32,
    /// Samples with normalized alpha below this are dropped
    pub alpha_threshold: f32,
    /// z coordinate given to every sample
    pub depth: f32,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            scale: 1.0,
            stride: 1,
            alpha_threshold: 0.5,
            depth: 0.0,
        }
    }
}

impl SamplerParams {
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::InvalidParameter("stride must be at least 1".to_string()));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "scale must be positive and finite, got {}",
                self.scale
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha_threshold) {
            return Err(Error::InvalidParameter(format!(
                "alpha threshold must be in [0, 1], got {}",
                self.alpha_threshold
            )));
        }
        Ok(())
    }

    /// Upper bound on the number of samples a frame can produce
    pub fn max_samples(&self, frame: &Frame) -> usize {
        let stride = self.stride.max(1);
        frame.width.div_ceil(stride) as usize * frame.height.div_ceil(stride) as usize
    }
}

/// Sample a frame into points, row-major, skipping `stride - 1` pixels between samples
///
/// Pixels whose alpha is strictly below `alpha_threshold` are dropped; a pixel
/// exactly at the threshold is kept. The result depends only on the frame and
/// the parameters.
///
/// # Example
/// ```rust
/// use capture3d_core::Frame;
/// use capture3d_algorithms::{sample_frame, SamplerParams};
///
/// fn main() -> capture3d_core::Result<()> {
///     let frame = Frame::filled(4, 4, [255, 255, 255, 255]);
///     let params = SamplerParams { stride: 2, ..Default::default() };
///     let points = sample_frame(&frame, &params)?;
///     assert_eq!(points.len(), 4);
///     Ok(())
/// }
/// ```
pub fn sample_frame(frame: &Frame, params: &SamplerParams) -> Result<Vec<Point>> {
    frame.validate()?;
    params.validate()?;

    let half_w = frame.width as f32 / 2.0;
    let half_h = frame.height as f32 / 2.0;
    let stride = params.stride as usize;

    let mut points = Vec::with_capacity(params.max_samples(frame));
    for py in (0..frame.height).step_by(stride) {
        for px in (0..frame.width).step_by(stride) {
            let [r, g, b, a] = frame.pixel(px, py);
            let alpha = a as f32 / 255.0;
            if alpha < params.alpha_threshold {
                continue;
            }

            let position = Point3f::new(
                params.origin_x + (px as f32 - half_w) / params.scale,
                params.origin_y + (half_h - py as f32) / params.scale,
                params.depth,
            );
            let color = [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0];
            points.push(Point::new(position, color, alpha));
        }
    }

    Ok(points)
}
