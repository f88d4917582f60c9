//! Coarse motion estimation between consecutive frames
//!
//! The estimate is one global displacement per frame pair, not dense flow. It
//! only serves as a relative depth proxy for video input.

use capture3d_core::{Frame, Result, Vector3f};

/// Red-channel difference (in 8-bit units) above which a pixel counts as changed
pub const CHANGE_THRESHOLD: u8 = 30;

/// Estimate the dominant displacement direction between two equal-sized frames
///
/// Every pixel whose red channel changed by more than [`CHANGE_THRESHOLD`]
/// contributes its offset from the frame centre. The accumulated offset is
/// normalized; a pair with no changed pixels, or whose offsets cancel out,
/// yields the zero vector. `z` is always 0.
pub fn estimate_motion(prev: &Frame, curr: &Frame) -> Result<Vector3f> {
    prev.validate()?;
    curr.validate()?;
    prev.ensure_same_size(curr.width, curr.height)?;

    let cx = prev.width as f64 / 2.0;
    let cy = prev.height as f64 / 2.0;
    let width = prev.width as usize;

    let mut dx = 0.0f64;
    let mut dy = 0.0f64;
    let mut changed = 0usize;

    for (i, (a, b)) in prev
        .pixels
        .chunks_exact(4)
        .zip(curr.pixels.chunks_exact(4))
        .enumerate()
    {
        if a[0].abs_diff(b[0]) > CHANGE_THRESHOLD {
            dx += (i % width) as f64 - cx;
            dy += (i / width) as f64 - cy;
            changed += 1;
        }
    }

    log::trace!("motion: {} changed pixels, offset sum ({:.1}, {:.1})", changed, dx, dy);

    let sum = Vector3f::new(dx as f32, dy as f32, 0.0);
    Ok(sum.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros))
}

/// Motion for every frame of a sequence
///
/// Entry 0 is the zero vector; entry `i` compares frame `i - 1` with frame `i`.
pub fn estimate_motions(frames: &[Frame]) -> Result<Vec<Vector3f>> {
    let mut motions = Vec::with_capacity(frames.len());
    if let Some(first) = frames.first() {
        first.validate()?;
        motions.push(Vector3f::zeros());
    }
    for pair in frames.windows(2) {
        motions.push(estimate_motion(&pair[0], &pair[1])?);
    }
    Ok(motions)
}

/// Depth proxy for a frame with the given motion
pub fn motion_depth(motion: &Vector3f, depth_scale: f32) -> f32 {
    motion.norm() * depth_scale
}
