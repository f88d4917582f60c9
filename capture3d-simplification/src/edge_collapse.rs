//! Edge collapse decimation
//!
//! Collapses edges in the order they appear in the triangle list (three per
//! triangle, duplicates included). Each collapse merges the two endpoints into
//! one vertex at their midpoint and retires every triangle that became
//! degenerate. There is no error metric: order alone decides, which keeps the
//! result deterministic and the pass linear in the number of edges.

use crate::MeshSimplifier;
use capture3d_core::{Edge, Point3f, Result, TriangleMesh};

/// Edges examined per [`Decimation::step`] by default
pub const DEFAULT_EDGES_PER_STEP: usize = 1024;

/// Edge collapse mesh simplifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCollapseSimplifier {
    /// Edges examined between suspension points
    pub edges_per_step: usize,
}

impl Default for EdgeCollapseSimplifier {
    fn default() -> Self {
        Self {
            edges_per_step: DEFAULT_EDGES_PER_STEP,
        }
    }
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edges_per_step(edges_per_step: usize) -> Self {
        Self {
            edges_per_step: edges_per_step.max(1),
        }
    }

    /// Begin a resumable decimation of `mesh` down to `target_triangles`
    pub fn start(&self, mesh: &TriangleMesh, target_triangles: usize) -> Result<Decimation> {
        mesh.validate()?;
        Ok(Decimation::new(mesh, target_triangles))
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, target_triangles: usize) -> Result<TriangleMesh> {
        if target_triangles >= mesh.triangle_count() {
            mesh.validate()?;
            return Ok(mesh.clone());
        }

        let mut decimation = self.start(mesh, target_triangles)?;
        while decimation.step(self.edges_per_step) {}
        Ok(decimation.finish())
    }
}

/// Decimate `mesh` until it has at most `target_triangles` triangles or no
/// collapsible edge is left
///
/// A target at or above the current count returns an unchanged copy. The
/// triangle count of the result never exceeds the input's.
pub fn decimate(mesh: &TriangleMesh, target_triangles: usize) -> Result<TriangleMesh> {
    EdgeCollapseSimplifier::new().simplify(mesh, target_triangles)
}

/// A decimation in progress
///
/// The state between steps is always a complete mesh: [`Decimation::snapshot`]
/// can be called at any time. The source mesh is never modified.
#[derive(Debug, Clone)]
pub struct Decimation {
    positions: Vec<Point3f>,
    triangles: Vec<[u32; 3]>,
    alive: Vec<bool>,
    live_triangles: usize,
    /// Union-find parent; a vertex is a survivor when it is its own parent
    parent: Vec<u32>,
    /// Triangles touching each survivor
    incident: Vec<Vec<u32>>,
    edges: Vec<Edge>,
    next_edge: usize,
    target: usize,
    had_normals: bool,
    collapses: usize,
}

impl Decimation {
    fn new(mesh: &TriangleMesh, target: usize) -> Self {
        let mut incident = vec![Vec::new(); mesh.vertex_count()];
        for (ti, tri) in mesh.triangles.iter().enumerate() {
            for (k, &v) in tri.iter().enumerate() {
                if !tri[..k].contains(&v) {
                    incident[v as usize].push(ti as u32);
                }
            }
        }

        Self {
            positions: mesh.vertices.clone(),
            triangles: mesh.triangles.clone(),
            alive: vec![true; mesh.triangle_count()],
            live_triangles: mesh.triangle_count(),
            parent: (0..mesh.vertex_count() as u32).collect(),
            incident,
            edges: mesh.edges().collect(),
            next_edge: 0,
            target,
            had_normals: mesh.normals.is_some(),
            collapses: 0,
        }
    }

    fn find(&mut self, v: u32) -> u32 {
        let mut root = v;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut cur = v;
        while self.parent[cur as usize] != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    fn is_degenerate(&mut self, triangle: u32) -> bool {
        let [a, b, c] = self.triangles[triangle as usize];
        let (a, b, c) = (self.find(a), self.find(b), self.find(c));
        a == b || b == c || c == a
    }

    fn collapse(&mut self, edge: Edge) {
        let ra = self.find(edge.0);
        let rb = self.find(edge.1);
        if ra == rb {
            return;
        }
        let (keep, gone) = (ra.min(rb), ra.max(rb));

        let midpoint =
            nalgebra::center(&self.positions[keep as usize], &self.positions[gone as usize]);
        self.positions[keep as usize] = midpoint;
        self.parent[gone as usize] = keep;
        self.collapses += 1;

        let moved = std::mem::take(&mut self.incident[gone as usize]);
        let mut survivors = Vec::with_capacity(moved.len());
        for t in moved {
            if !self.alive[t as usize] {
                continue;
            }
            if self.is_degenerate(t) {
                self.alive[t as usize] = false;
                self.live_triangles -= 1;
            } else {
                survivors.push(t);
            }
        }
        self.incident[keep as usize].extend(survivors);
    }

    /// Whether the target is met or every edge has been examined
    pub fn is_done(&self) -> bool {
        self.live_triangles <= self.target || self.next_edge >= self.edges.len()
    }

    /// Examine up to `budget` edges; returns `true` while work remains
    pub fn step(&mut self, budget: usize) -> bool {
        let mut examined = 0;
        while examined < budget.max(1) && !self.is_done() {
            let edge = self.edges[self.next_edge];
            self.next_edge += 1;
            examined += 1;
            self.collapse(edge);
        }
        !self.is_done()
    }

    /// Triangles still present
    pub fn triangle_count(&self) -> usize {
        self.live_triangles
    }

    /// Number of edges collapsed so far
    pub fn collapse_count(&self) -> usize {
        self.collapses
    }

    /// The mesh as it stands after the steps taken so far
    pub fn snapshot(&self) -> TriangleMesh {
        self.clone().finish()
    }

    /// Compact into a mesh holding the surviving vertices in original order
    pub fn finish(mut self) -> TriangleMesh {
        let mut remap = vec![u32::MAX; self.positions.len()];
        let mut vertices = Vec::new();
        for v in 0..self.positions.len() {
            if self.parent[v] == v as u32 {
                remap[v] = vertices.len() as u32;
                vertices.push(self.positions[v]);
            }
        }

        let mut triangles = Vec::with_capacity(self.live_triangles);
        for t in 0..self.triangles.len() {
            if !self.alive[t] {
                continue;
            }
            let [a, b, c] = self.triangles[t];
            let resolved = [a, b, c].map(|v| remap[self.find(v) as usize]);
            triangles.push(resolved);
        }

        log::debug!(
            "edge collapse: {} collapses, {} -> {} triangles, {} -> {} vertices",
            self.collapses,
            self.triangles.len(),
            triangles.len(),
            self.positions.len(),
            vertices.len()
        );

        let mut mesh = TriangleMesh::from_vertices_and_triangles(vertices, triangles);
        if self.had_normals {
            mesh.recompute_normals();
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture3d_core::{Error, Vector3f};
    use nalgebra::Point3;

    fn make_tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
                Point3::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    fn make_plane_grid(size: u32) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                vertices.push(Point3::new(x as f32, y as f32, 0.0));
            }
        }
        let mut triangles = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                triangles.push([tl, bl, tr]);
                triangles.push([tr, bl, br]);
            }
        }
        TriangleMesh::from_vertices_and_triangles(vertices, triangles)
    }

    fn assert_indices_valid(mesh: &TriangleMesh) {
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_target_at_or_above_count_is_noop() {
        let mesh = make_tetrahedron();
        assert_eq!(decimate(&mesh, 4).unwrap(), mesh);
        assert_eq!(decimate(&mesh, 100).unwrap(), mesh);
    }

    #[test]
    fn test_first_edge_collapse_on_tetrahedron() {
        let mesh = make_tetrahedron();
        let result = decimate(&mesh, 3).unwrap();
        // collapsing 0-2 retires the two faces sharing that edge
        assert_eq!(result.triangle_count(), 2);
        assert_eq!(result.vertex_count(), 3);
        assert_eq!(result.vertices[0], Point3::new(0.25, 0.5, 0.0));
        assert_indices_valid(&result);
    }

    #[test]
    fn test_zero_target_collapses_everything() {
        let mesh = make_plane_grid(6);
        let result = decimate(&mesh, 0).unwrap();
        assert_eq!(result.triangle_count(), 0);
        assert!(result.vertex_count() >= 1);
        assert!(result.vertex_count() < mesh.vertex_count());
    }

    #[test]
    fn test_grid_reduction() {
        let mesh = make_plane_grid(11);
        assert_eq!(mesh.triangle_count(), 200);
        let result = decimate(&mesh, 100).unwrap();
        assert!(result.triangle_count() <= 100);
        assert!(result.triangle_count() > 0);
        assert_indices_valid(&result);
    }

    #[test]
    fn test_count_never_increases_across_calls() {
        let mut mesh = make_plane_grid(8);
        let mut previous = mesh.triangle_count();
        for target in [80, 60, 90, 30, 10, 0] {
            mesh = decimate(&mesh, target).unwrap();
            assert!(mesh.triangle_count() <= previous);
            previous = mesh.triangle_count();
        }
    }

    #[test]
    fn test_stepwise_matches_single_call() {
        let mesh = make_plane_grid(9);
        let direct = decimate(&mesh, 40).unwrap();

        let mut decimation = EdgeCollapseSimplifier::with_edges_per_step(3)
            .start(&mesh, 40)
            .unwrap();
        let mut counts = vec![decimation.triangle_count()];
        while decimation.step(3) {
            let partial = decimation.snapshot();
            assert_indices_valid(&partial);
            counts.push(partial.triangle_count());
        }
        assert!(counts.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(decimation.finish(), direct);
    }

    #[test]
    fn test_normals_recomputed_when_present() {
        let mut mesh = make_plane_grid(5);
        mesh.normals = Some(vec![Vector3f::new(0.0, 0.0, 1.0); mesh.vertex_count()]);
        let result = decimate(&mesh, 10).unwrap();
        let normals = result.normals.as_ref().unwrap();
        assert_eq!(normals.len(), result.vertex_count());
    }

    #[test]
    fn test_invalid_indices_rejected() {
        let mesh = TriangleMesh::from_vertices_and_triangles(
            vec![Point3::origin(); 2],
            vec![[0, 1, 2]],
        );
        assert!(matches!(decimate(&mesh, 0), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_unindexed_mesh_is_noop() {
        let mesh = TriangleMesh::from_vertices_and_triangles(vec![Point3::origin(); 3], vec![]);
        assert_eq!(decimate(&mesh, 0).unwrap(), mesh);
    }
}
