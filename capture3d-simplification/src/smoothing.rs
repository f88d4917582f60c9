//! Laplacian smoothing

use capture3d_core::{Error, Point3f, Result, TriangleMesh};
use itertools::Itertools;

/// Direct edge neighbors of every vertex, sorted and without the vertex itself
pub fn vertex_neighbors(mesh: &TriangleMesh) -> Vec<Vec<u32>> {
    let mut neighbors = vec![Vec::new(); mesh.vertex_count()];
    for &[a, b, c] in &mesh.triangles {
        for (from, to) in [(a, b), (b, c), (c, a)] {
            if from != to {
                neighbors[from as usize].push(to);
                neighbors[to as usize].push(from);
            }
        }
    }
    neighbors
        .into_iter()
        .map(|n| n.into_iter().sorted_unstable().dedup().collect())
        .collect()
}

/// Laplacian smoother
///
/// Each iteration moves every vertex toward the centroid of its neighbors by
/// `lambda`, reading only positions from before the iteration. With the
/// default `lambda = 1` a vertex lands exactly on the centroid. Isolated
/// vertices stay where they are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaplacianSmoother {
    pub iterations: u32,
    pub lambda: f32,
}

impl Default for LaplacianSmoother {
    fn default() -> Self {
        Self {
            iterations: 1,
            lambda: 1.0,
        }
    }
}

impl LaplacianSmoother {
    pub fn new(iterations: u32, lambda: f32) -> Self {
        Self { iterations, lambda }
    }

    pub fn smooth(&self, mesh: &TriangleMesh) -> Result<TriangleMesh> {
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(Error::InvalidParameter(format!(
                "lambda must be in [0, 1], got {}",
                self.lambda
            )));
        }
        mesh.require_indexed()?;

        let neighbors = vertex_neighbors(mesh);
        let mut positions = mesh.vertices.clone();
        for _ in 0..self.iterations {
            positions = neighbors
                .iter()
                .zip(&positions)
                .map(|(adjacent, &old)| {
                    if adjacent.is_empty() {
                        return old;
                    }
                    let sum = adjacent
                        .iter()
                        .fold(nalgebra::Vector3::zeros(), |acc, &n| {
                            acc + positions[n as usize].coords
                        });
                    let centroid = sum / adjacent.len() as f32;
                    Point3f::from(old.coords * (1.0 - self.lambda) + centroid * self.lambda)
                })
                .collect();
        }

        let mut smoothed = TriangleMesh {
            vertices: positions,
            normals: None,
            triangles: mesh.triangles.clone(),
        };
        smoothed.recompute_normals();
        log::debug!(
            "smoothed {} vertices over {} iterations",
            smoothed.vertex_count(),
            self.iterations
        );
        Ok(smoothed)
    }
}

/// One synchronous centroid pass followed by normal recomputation
pub fn smooth(mesh: &TriangleMesh) -> Result<TriangleMesh> {
    LaplacianSmoother::default().smooth(mesh)
}
