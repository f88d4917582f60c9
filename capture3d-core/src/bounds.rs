//! Axis-aligned bounding boxes

use crate::point::Point3f;
use serde::{Deserialize, Serialize};

/// Padding applied to each side of a degenerate (zero-extent) box axis
pub const DEGENERATE_PADDING: f32 = 1e-4;

/// Axis-aligned box with inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3f,
    pub max: Point3f,
}

impl BoundingBox {
    pub fn new(min: Point3f, max: Point3f) -> Self {
        Self { min, max }
    }

    /// Tight box around a set of positions, `None` when the set is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;

        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    /// Box centred on `center` extending `half_extent` along every axis
    pub fn around(center: Point3f, half_extent: f32) -> Self {
        let h = half_extent.abs();
        Self {
            min: Point3f::new(center.x - h, center.y - h, center.z - h),
            max: Point3f::new(center.x + h, center.y + h, center.z + h),
        }
    }

    /// Widen every axis whose extent is below `epsilon` by `epsilon` on each side
    pub fn padded(mut self, epsilon: f32) -> Self {
        for axis in 0..3 {
            if self.max[axis] - self.min[axis] < epsilon {
                self.min[axis] -= epsilon;
                self.max[axis] += epsilon;
            }
        }
        self
    }

    pub fn center(&self) -> Point3f {
        Point3f::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    pub fn extent(&self) -> [f32; 3] {
        [
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        ]
    }

    pub fn contains(&self, p: &Point3f) -> bool {
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// Squared distance from `p` to the closest point of the box (0 inside)
    pub fn distance_squared(&self, p: &Point3f) -> f32 {
        (0..3)
            .map(|axis| {
                let d = (self.min[axis] - p[axis]).max(p[axis] - self.max[axis]).max(0.0);
                d * d
            })
            .sum()
    }

    /// Octant index of `p` relative to the box centre: bit 0 = x, bit 1 = y, bit 2 = z
    pub fn octant_of(&self, p: &Point3f) -> usize {
        let c = self.center();
        (p.x >= c.x) as usize | ((p.y >= c.y) as usize) << 1 | ((p.z >= c.z) as usize) << 2
    }

    /// One of the 8 equal sub-boxes, numbered as in [`BoundingBox::octant_of`]
    pub fn octant(&self, index: usize) -> BoundingBox {
        let c = self.center();
        let mut min = self.min;
        let mut max = c;
        for axis in 0..3 {
            if index & (1 << axis) != 0 {
                min[axis] = c[axis];
                max[axis] = self.max[axis];
            }
        }
        BoundingBox { min, max }
    }
}
