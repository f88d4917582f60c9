//! Core traits for capture3d

use crate::{bounds::BoundingBox, mesh::TriangleMesh, point::*, point_cloud::PointCloud};

/// Trait for nearest neighbor search functionality
pub trait NearestNeighborSearch {
    /// Find the k nearest neighbors to a query point
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)>;

    /// Find all neighbors within a given radius
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)>;
}

/// Geometry with an axis-aligned extent
pub trait Bounded {
    /// Tight bounding box, `None` for empty geometry
    fn bounding_box(&self) -> Option<BoundingBox>;

    /// Center of the bounding box
    fn center(&self) -> Option<Point3f> {
        self.bounding_box().map(|bb| bb.center())
    }
}

impl Bounded for PointCloud {
    fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points.iter().map(|p| &p.position))
    }
}

impl Bounded for TriangleMesh {
    fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }
}
