//! Point cloud data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// An ordered set of sampled points tagged with the generation that produced it
///
/// A cloud is owned by exactly one pipeline stage at a time. Stages that change
/// the point set return a new cloud instead of patching this one, so any
/// spatial index built for a generation stays valid for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub generation: u64,
}

impl PointCloud {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            generation: 0,
        }
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            points,
            generation: 0,
        }
    }

    /// Tag the cloud with a generation id
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the cloud
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    /// Positions only, in point order
    pub fn positions(&self) -> Vec<Point3f> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Flat `xyz` buffer ready for a vertex upload
    pub fn position_buffer(&self) -> Vec<[f32; 3]> {
        self.points
            .iter()
            .map(|p| [p.position.x, p.position.y, p.position.z])
            .collect()
    }

    /// Flat `rgba` buffer ready for a vertex upload
    pub fn color_buffer(&self) -> Vec<[f32; 4]> {
        self.points
            .iter()
            .map(|p| [p.color[0], p.color[1], p.color[2], p.alpha])
            .collect()
    }

    /// Raw bytes of the interleaved point records
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }
}

impl Index<usize> for PointCloud {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl IntoIterator for PointCloud {
    type Item = Point;
    type IntoIter = std::vec::IntoIter<Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl Extend<Point> for PointCloud {
    fn extend<I: IntoIterator<Item = Point>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}

impl FromIterator<Point> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::from_points(Vec::from_iter(iter))
    }
}
