//! Mesh simplification and repair
//!
//! This crate provides the mesh half of the capture pipeline:
//! - Edge collapse decimation
//! - Boundary loop detection
//! - Ear-clipping hole filling
//! - Laplacian smoothing
//!
//! Every operation reads its input mesh and returns a new one, so abandoning
//! an operation midway never leaves the caller's mesh altered.

pub mod boundary;
pub mod edge_collapse;
pub mod hole_filling;
pub mod smoothing;

pub use boundary::*;
pub use edge_collapse::*;
pub use hole_filling::*;
pub use smoothing::*;

use capture3d_core::{Result, TriangleMesh};

/// Reduce a mesh toward a triangle budget
pub trait MeshSimplifier {
    /// Simplify `mesh` to at most `target_triangles` triangles where possible
    fn simplify(&self, mesh: &TriangleMesh, target_triangles: usize) -> Result<TriangleMesh>;
}

/// Fill every hole, then smooth once
pub fn repair_mesh(mesh: &TriangleMesh) -> Result<TriangleMesh> {
    let filled = fill_holes(mesh)?;
    smooth(&filled)
}
