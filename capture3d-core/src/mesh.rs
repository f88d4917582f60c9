//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// An unordered vertex pair stored as `(min, max)`
///
/// Edges only exist while an operation runs; they are never stored in a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(pub u32, pub u32);

impl Edge {
    /// Canonical edge between `a` and `b`
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            Edge(a, b)
        } else {
            Edge(b, a)
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.0 == self.1
    }
}

/// An indexed triangle mesh
///
/// Every index in `triangles` must be `< vertices.len()`; see
/// [`TriangleMesh::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and triangles
    pub fn from_vertices_and_triangles(vertices: Vec<Point3f>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            normals: None,
            triangles,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh carries an index buffer
    pub fn is_indexed(&self) -> bool {
        !self.triangles.is_empty()
    }

    /// Check that every triangle index refers to an existing vertex
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();
        for (ti, tri) in self.triangles.iter().enumerate() {
            if let Some(&bad) = tri.iter().find(|&&v| v as usize >= count) {
                return Err(Error::InvalidParameter(format!(
                    "triangle {} references vertex {} but mesh has {} vertices",
                    ti, bad, count
                )));
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != count {
                return Err(Error::InvalidParameter(format!(
                    "mesh has {} normals for {} vertices",
                    normals.len(),
                    count
                )));
            }
        }
        Ok(())
    }

    /// Fail with `UnindexedMesh` unless the mesh has triangles
    pub fn require_indexed(&self) -> Result<()> {
        if !self.is_indexed() {
            return Err(Error::UnindexedMesh);
        }
        self.validate()
    }

    /// The three edges of every triangle, in triangle order, duplicates included
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.triangles.iter().flat_map(|&[a, b, c]| {
            [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)]
        })
    }

    /// Unnormalized face normal (length is twice the triangle area)
    pub fn face_normal(&self, triangle: &[u32; 3]) -> Vector3f {
        let v0 = self.vertices[triangle[0] as usize];
        let v1 = self.vertices[triangle[1] as usize];
        let v2 = self.vertices[triangle[2] as usize];

        (v1 - v0).cross(&(v2 - v0))
    }

    /// Unit face normals, zero for degenerate triangles
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.triangles
            .iter()
            .map(|tri| {
                self.face_normal(tri)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vector3f::zeros)
            })
            .collect()
    }

    /// Area-weighted vertex normals
    ///
    /// Vertices not used by any non-degenerate triangle get `+Z`.
    pub fn compute_vertex_normals(&self) -> Vec<Vector3f> {
        let mut accum = vec![Vector3f::zeros(); self.vertices.len()];
        for tri in &self.triangles {
            let n = self.face_normal(tri);
            for &v in tri {
                accum[v as usize] += n;
            }
        }
        accum
            .into_iter()
            .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::z))
            .collect()
    }

    /// Replace the normals with freshly computed vertex normals
    pub fn recompute_normals(&mut self) {
        self.normals = Some(self.compute_vertex_normals());
    }

    /// Flat index buffer ready for upload
    pub fn index_buffer(&self) -> &[u32] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Raw bytes of the vertex positions
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}
