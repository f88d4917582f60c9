//! Point types and related functionality

use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A sampled point with color and opacity
///
/// Color channels and alpha are normalized to `[0, 1]`. Points are produced by
/// frame sampling and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Point {
    pub position: Point3f,
    pub color: [f32; 3],
    pub alpha: f32,
}

unsafe impl Pod for Point {}
unsafe impl Zeroable for Point {}

impl Point {
    pub fn new(position: Point3f, color: [f32; 3], alpha: f32) -> Self {
        Self {
            position,
            color,
            alpha,
        }
    }

    /// Mean of the three color channels
    pub fn luminance(&self) -> f32 {
        (self.color[0] + self.color[1] + self.color[2]) / 3.0
    }

    /// Copy of this point moved to a new depth
    pub fn with_depth(mut self, z: f32) -> Self {
        self.position.z = z;
        self
    }
}

impl Default for Point {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            color: [1.0, 1.0, 1.0],
            alpha: 1.0,
        }
    }
}

impl From<Point> for Point3f {
    fn from(point: Point) -> Self {
        point.position
    }
}
