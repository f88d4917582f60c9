//! Boundary edge and boundary loop detection

use capture3d_core::{Edge, Result, TriangleMesh};
use std::collections::BTreeMap;

/// A chain of boundary vertices in traversal order
///
/// For a closed loop the closing edge runs from the last vertex back to the
/// first. Non-manifold input can leave chains that never return to their start;
/// those are reported with `closed == false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    pub vertices: Vec<u32>,
    pub closed: bool,
}

impl BoundaryLoop {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Number of triangles using each canonical edge
///
/// Degenerate edges (both endpoints equal) are not counted.
pub fn edge_incidence(mesh: &TriangleMesh) -> BTreeMap<Edge, usize> {
    let mut counts = BTreeMap::new();
    for edge in mesh.edges().filter(|e| !e.is_degenerate()) {
        *counts.entry(edge).or_insert(0) += 1;
    }
    counts
}

/// Boundary edges directed as they run in their single triangle, in triangle order
pub fn boundary_edges(mesh: &TriangleMesh) -> Vec<(u32, u32)> {
    let incidence = edge_incidence(mesh);
    mesh.triangles
        .iter()
        .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
        .filter(|&(a, b)| a != b && incidence.get(&Edge::new(a, b)) == Some(&1))
        .collect()
}

/// Whether every edge of the mesh is shared by exactly two triangles
pub fn is_closed(mesh: &TriangleMesh) -> bool {
    edge_incidence(mesh).values().all(|&count| count == 2)
}

/// Chain the boundary edges of `mesh` into loops
///
/// Loops follow the winding of the triangles along the boundary, so a hole is
/// walked in the same direction its neighboring faces traverse those edges.
/// At vertices with several boundary edges the walk prefers the edge leaving in
/// the current direction. A chain that cannot be closed (non-manifold input)
/// is still reported, marked as not closed.
pub fn find_boundaries(mesh: &TriangleMesh) -> Result<Vec<BoundaryLoop>> {
    mesh.validate()?;
    let edges = boundary_edges(mesh);

    let mut touching: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (id, &(a, b)) in edges.iter().enumerate() {
        touching.entry(a).or_default().push(id);
        touching.entry(b).or_default().push(id);
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();

    for start_id in 0..edges.len() {
        if used[start_id] {
            continue;
        }
        used[start_id] = true;
        let (start, mut current) = edges[start_id];
        let mut boundary = vec![start];

        let closed = loop {
            if current == start {
                break true;
            }
            boundary.push(current);

            let candidates = touching.get(&current).map(Vec::as_slice).unwrap_or(&[]);
            let next = candidates
                .iter()
                .copied()
                .find(|&id| !used[id] && edges[id].0 == current)
                .or_else(|| candidates.iter().copied().find(|&id| !used[id]));

            match next {
                Some(id) => {
                    used[id] = true;
                    let (a, b) = edges[id];
                    current = if a == current { b } else { a };
                }
                None => break false,
            }
        };

        if !closed {
            log::warn!(
                "boundary chain starting at vertex {} does not close ({} vertices)",
                start,
                boundary.len()
            );
        }
        loops.push(BoundaryLoop {
            vertices: boundary,
            closed,
        });
    }

    log::debug!(
        "found {} boundary loops over {} boundary edges",
        loops.len(),
        edges.len()
    );
    Ok(loops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture3d_core::Point3f;

    fn make_cube(skip_top: bool) -> TriangleMesh {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
        ];
        let mut triangles = vec![
            [0, 2, 1], [0, 3, 2], // bottom
            [0, 1, 5], [0, 5, 4], // front
            [1, 2, 6], [1, 6, 5], // right
            [2, 3, 7], [2, 7, 6], // back
            [3, 0, 4], [3, 4, 7], // left
        ];
        if !skip_top {
            triangles.extend([[4, 5, 6], [4, 6, 7]]);
        }
        TriangleMesh::from_vertices_and_triangles(vertices, triangles)
    }

    #[test]
    fn test_closed_cube_has_no_boundaries() {
        let cube = make_cube(false);
        assert!(is_closed(&cube));
        assert!(find_boundaries(&cube).unwrap().is_empty());
    }

    #[test]
    fn test_open_cube_has_one_square_loop() {
        let cube = make_cube(true);
        assert!(!is_closed(&cube));
        let loops = find_boundaries(&cube).unwrap();
        assert_eq!(loops.len(), 1);
        assert!(loops[0].closed);
        let mut verts = loops[0].vertices.clone();
        assert_eq!(verts.len(), 4);
        verts.sort_unstable();
        assert_eq!(verts, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_loop_follows_triangle_winding() {
        let tri = TriangleMesh::from_vertices_and_triangles(
            vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        let loops = find_boundaries(&tri).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].vertices, vec![0, 1, 2]);
        assert!(loops[0].closed);
    }

    #[test]
    fn test_two_separate_holes() {
        let a = TriangleMesh::from_vertices_and_triangles(
            vec![
                Point3f::origin(),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(5.0, 0.0, 0.0),
                Point3f::new(6.0, 0.0, 0.0),
                Point3f::new(5.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        let loops = find_boundaries(&a).unwrap();
        let vertices: Vec<_> = loops.iter().map(|l| l.vertices.clone()).collect();
        assert_eq!(vertices, vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert!(loops.iter().all(|l| l.closed));
    }

    #[test]
    fn test_incidence_counts() {
        let cube = make_cube(true);
        let incidence = edge_incidence(&cube);
        assert_eq!(incidence[&Edge(4, 5)], 1);
        assert_eq!(incidence[&Edge(0, 2)], 2);
        assert_eq!(boundary_edges(&cube).len(), 4);
    }

    #[test]
    fn test_unindexed_mesh_has_no_boundaries() {
        let mesh = TriangleMesh::from_vertices_and_triangles(vec![Point3f::origin()], vec![]);
        assert!(find_boundaries(&mesh).unwrap().is_empty());
    }

    /// Three triangles sharing edge 0-1
    fn fan_on_shared_edge() -> TriangleMesh {
        TriangleMesh::from_vertices_and_triangles(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, -1.0, 0.0),
                Point3f::new(0.5, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        )
    }

    #[test]
    fn test_non_manifold_edge_leaves_open_chain() {
        let mesh = fan_on_shared_edge();
        assert!(!is_closed(&mesh));
        assert_eq!(edge_incidence(&mesh)[&Edge(0, 1)], 3);

        let loops = find_boundaries(&mesh).unwrap();
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].vertices, vec![1, 2, 0, 3]);
        assert!(loops[0].closed);
        assert_eq!(loops[1].vertices, vec![1, 4, 0]);
        assert!(!loops[1].closed);
    }
}
