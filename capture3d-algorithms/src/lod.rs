//! Level-of-detail generation for point clouds
//!
//! Level `i` keeps every `2^i`-th point of the source cloud in its original
//! order. The decimation is deterministic and needs one pass per level, which
//! keeps preview builds reproducible.

use capture3d_core::{Error, PointCloud, Result};
use serde::{Deserialize, Serialize};

/// Distance above which the coarsest level is shown
pub const FAR_DISTANCE: f32 = 50.0;
/// Distance above which the second-coarsest level is shown
pub const MID_FAR_DISTANCE: f32 = 20.0;
/// Distance above which the middle level is shown
pub const MID_DISTANCE: f32 = 10.0;
/// Distance above which the finest decimated level is shown
pub const NEAR_DISTANCE: f32 = 5.0;

/// One decimated copy of a cloud
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Fraction of source points nominally kept, `1 / 2^level`
    pub decimation_ratio: f32,
    pub points: PointCloud,
}

impl LodLevel {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Keep-every-n stride for `level`, saturating for very deep levels
pub fn level_stride(level: u32) -> usize {
    1usize.checked_shl(level).unwrap_or(usize::MAX)
}

fn decimate(cloud: &PointCloud, level: u32) -> LodLevel {
    let stride = level_stride(level);
    let points = cloud.points.iter().step_by(stride).copied().collect();
    LodLevel {
        decimation_ratio: 1.0 / 2f32.powi(level.min(127) as i32),
        points: PointCloud::from_points(points).with_generation(cloud.generation),
    }
}

/// Lazily produced LOD levels, finest first
///
/// Each call to `next` builds exactly one level, so a single-threaded host can
/// interleave generation with other work. Dropping the iterator early leaves
/// the levels produced so far complete and valid.
#[derive(Debug, Clone)]
pub struct LodLevels {
    source: PointCloud,
    level_count: u32,
    next_level: u32,
}

impl LodLevels {
    /// Start generating `level_count` levels from `cloud`
    pub fn new(cloud: PointCloud, level_count: u32) -> Result<Self> {
        if level_count == 0 {
            return Err(Error::InvalidParameter("level count must be at least 1".to_string()));
        }
        if cloud.is_empty() {
            return Err(Error::EmptyInput("cannot build levels from an empty cloud".to_string()));
        }
        Ok(Self {
            source: cloud,
            level_count,
            next_level: 0,
        })
    }

    pub fn level_count(&self) -> u32 {
        self.level_count
    }
}

impl Iterator for LodLevels {
    type Item = LodLevel;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_level >= self.level_count {
            return None;
        }
        let level = decimate(&self.source, self.next_level);
        log::trace!(
            "LOD level {}: {} of {} points",
            self.next_level,
            level.len(),
            self.source.len()
        );
        self.next_level += 1;
        Some(level)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.level_count - self.next_level) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LodLevels {}

/// Build all `level_count` levels of `cloud`
///
/// Level 0 is the unmodified cloud. Point counts never increase from one level
/// to the next, and no level of a non-empty cloud is ever empty.
pub fn generate_levels(cloud: PointCloud, level_count: u32) -> Result<Vec<LodLevel>> {
    let levels: Vec<LodLevel> = LodLevels::new(cloud, level_count)?.collect();
    log::debug!(
        "generated {} LOD levels: {:?}",
        levels.len(),
        levels.iter().map(LodLevel::len).collect::<Vec<_>>()
    );
    Ok(levels)
}

/// Index of the level to show at `camera_distance` out of `level_count` levels
///
/// The ladder is: beyond 50 the coarsest level, beyond 20 the second coarsest,
/// beyond 10 the middle one, beyond 5 level 1, otherwise level 0. Each rung is
/// clamped to the rung above so fewer levels still give a ladder that never gets
/// finer as the camera moves away. NaN and negative distances select level 0.
pub fn select_level(level_count: usize, camera_distance: f32) -> usize {
    if level_count == 0 {
        return 0;
    }
    let coarsest = level_count - 1;
    let second = level_count.saturating_sub(2);
    let middle = (level_count / 2).min(second);
    let finest_decimated = 1.min(middle);

    if camera_distance > FAR_DISTANCE {
        coarsest
    } else if camera_distance > MID_FAR_DISTANCE {
        second
    } else if camera_distance > MID_DISTANCE {
        middle
    } else if camera_distance > NEAR_DISTANCE {
        finest_decimated
    } else {
        0
    }
}

/// The single level that should be visible at `camera_distance`
pub fn select_active_level(levels: &[LodLevel], camera_distance: f32) -> Option<&LodLevel> {
    levels.get(select_level(levels.len(), camera_distance))
}
