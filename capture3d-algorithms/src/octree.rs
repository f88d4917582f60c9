//! Octree spatial index over a point cloud
//!
//! The tree is built in one pass and never patched: a new point set means a
//! new tree. Nodes live in a flat arena and refer to children by position.

use capture3d_core::{
    BoundingBox, Bounded, Error, NearestNeighborSearch, Point3f, PointCloud, Result,
    DEGENERATE_PADDING,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, PoisonError, RwLock};

/// Deepest tree [`Octree::build`] accepts; boxes below this are under f32 precision
pub const MAX_SUPPORTED_DEPTH: u32 = 32;

/// Build parameters for [`Octree::build`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParams {
    pub max_depth: u32,
    pub max_points_per_leaf: u32,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_points_per_leaf: 64,
        }
    }
}

impl IndexParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_points_per_leaf == 0 {
            return Err(Error::InvalidParameter(
                "max_points_per_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(Error::InvalidParameter(format!(
                "max_depth {} exceeds the supported maximum of {}",
                self.max_depth, MAX_SUPPORTED_DEPTH
            )));
        }
        Ok(())
    }
}

/// Contents of an octree node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Indices of the points inside this node
    Leaf(Vec<u32>),
    /// Arena positions of the 8 octants, numbered as in [`BoundingBox::octant`]
    Internal([usize; 8]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OctreeNode {
    pub bounds: BoundingBox,
    pub depth: u32,
    pub kind: NodeKind,
}

impl OctreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }
}

/// Read-only octree over the positions of one point cloud generation
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    positions: Vec<Point3f>,
    generation: u64,
    params: IndexParams,
}

impl Octree {
    /// Build the index for `cloud`
    ///
    /// A node splits into 8 equal octants while it holds more than
    /// `max_points_per_leaf` points and sits above `max_depth`. At the depth cap
    /// a leaf keeps all of its points, however many.
    pub fn build(cloud: &PointCloud, params: IndexParams) -> Result<Self> {
        params.validate()?;
        let root_bounds = cloud
            .bounding_box()
            .ok_or_else(|| Error::EmptyInput("cannot index an empty point cloud".to_string()))?
            .padded(DEGENERATE_PADDING);

        let positions = cloud.positions();
        let mut nodes = vec![OctreeNode {
            bounds: root_bounds,
            depth: 0,
            kind: NodeKind::Leaf(Vec::new()),
        }];

        let mut work: Vec<(usize, Vec<u32>)> = vec![(0, (0..positions.len() as u32).collect())];
        while let Some((node_idx, indices)) = work.pop() {
            let (bounds, depth) = (nodes[node_idx].bounds, nodes[node_idx].depth);

            if indices.len() <= params.max_points_per_leaf as usize || depth >= params.max_depth {
                nodes[node_idx].kind = NodeKind::Leaf(indices);
                continue;
            }

            let mut buckets: [Vec<u32>; 8] = Default::default();
            for i in indices {
                buckets[bounds.octant_of(&positions[i as usize])].push(i);
            }

            let mut children = [0usize; 8];
            for (octant, bucket) in buckets.into_iter().enumerate() {
                let child = nodes.len();
                nodes.push(OctreeNode {
                    bounds: bounds.octant(octant),
                    depth: depth + 1,
                    kind: NodeKind::Leaf(Vec::new()),
                });
                children[octant] = child;
                if !bucket.is_empty() {
                    work.push((child, bucket));
                }
            }
            nodes[node_idx].kind = NodeKind::Internal(children);
        }

        let tree = Self {
            nodes,
            positions,
            generation: cloud.generation,
            params,
        };
        log::debug!(
            "indexed generation {}: {} points, {} nodes, {} leaves, depth {}",
            tree.generation,
            tree.positions.len(),
            tree.nodes.len(),
            tree.leaf_count(),
            tree.depth()
        );
        Ok(tree)
    }

    /// Generation of the cloud this index was built from
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn params(&self) -> IndexParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Leaves in depth-first octant order, with their point indices
    pub fn leaves(&self) -> impl Iterator<Item = (&BoundingBox, &[u32])> + '_ {
        self.nodes.iter().filter_map(|node| match &node.kind {
            NodeKind::Leaf(indices) => Some((&node.bounds, indices.as_slice())),
            NodeKind::Internal(_) => None,
        })
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Deepest node depth (0 for a single-leaf tree)
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Indices of points in leaves intersecting `query`
    ///
    /// Filtering is at leaf granularity: a returned point may lie outside the
    /// box if its leaf overlaps it. Use [`Octree::query_exact`] for point-exact
    /// membership. Every point inside the box is always returned.
    pub fn query(&self, query: &BoundingBox) -> Vec<usize> {
        let mut result = Vec::new();
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bounds.intersects(query) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(indices) => result.extend(indices.iter().map(|&i| i as usize)),
                NodeKind::Internal(children) => stack.extend(children.iter().rev()),
            }
        }
        result
    }

    /// [`Octree::query`] refined to points actually inside `query`
    pub fn query_exact(&self, query: &BoundingBox) -> Vec<usize> {
        self.query(query)
            .into_iter()
            .filter(|&i| query.contains(&self.positions[i]))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_sq: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.index.cmp(&other.index))
    }
}

impl NearestNeighborSearch for Octree {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        if k == 0 {
            return Vec::new();
        }

        // nodes ordered nearest-box-first, best points kept in a max-heap of size k
        let mut frontier = BinaryHeap::new();
        frontier.push(std::cmp::Reverse(Candidate {
            distance_sq: self.nodes[0].bounds.distance_squared(query),
            index: 0,
        }));
        let mut best: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);

        while let Some(std::cmp::Reverse(node_ref)) = frontier.pop() {
            if best.len() == k {
                if let Some(worst) = best.peek() {
                    if node_ref.distance_sq > worst.distance_sq {
                        break;
                    }
                }
            }
            match &self.nodes[node_ref.index].kind {
                NodeKind::Leaf(indices) => {
                    for &i in indices {
                        let candidate = Candidate {
                            distance_sq: (self.positions[i as usize] - query).norm_squared(),
                            index: i as usize,
                        };
                        best.push(candidate);
                        if best.len() > k {
                            best.pop();
                        }
                    }
                }
                NodeKind::Internal(children) => {
                    for &child in children {
                        frontier.push(std::cmp::Reverse(Candidate {
                            distance_sq: self.nodes[child].bounds.distance_squared(query),
                            index: child,
                        }));
                    }
                }
            }
        }

        best.into_sorted_vec()
            .into_iter()
            .map(|c| (c.index, c.distance_sq.sqrt()))
            .collect()
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        if !(radius >= 0.0) {
            return Vec::new();
        }
        let radius_squared = radius * radius;
        self.query(&BoundingBox::around(*query, radius))
            .into_iter()
            .filter_map(|i| {
                let distance_squared = (self.positions[i] - query).norm_squared();
                if distance_squared <= radius_squared {
                    Some((i, distance_squared.sqrt()))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// An octree snapshot that readers can hold while a newer one is swapped in
///
/// Readers take an `Arc` and keep using it for as long as they like; a rebuild
/// never touches a published tree, it replaces the pointer.
#[derive(Debug, Default)]
pub struct SharedIndex {
    current: RwLock<Option<Arc<Octree>>>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The published tree, if any
    pub fn snapshot(&self) -> Option<Arc<Octree>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish `index` unless a tree of a newer generation is already published
    ///
    /// Returns whether the swap happened.
    pub fn replace(&self, index: Octree) -> bool {
        self.publish(Arc::new(index))
    }

    fn publish(&self, index: Arc<Octree>) -> bool {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = guard.as_ref() {
            if existing.generation() > index.generation() {
                log::warn!(
                    "ignoring index for generation {}; generation {} already published",
                    index.generation(),
                    existing.generation()
                );
                return false;
            }
        }
        *guard = Some(index);
        true
    }

    /// Build and publish an index for `cloud`
    ///
    /// The returned tree is always the one built from `cloud`. If a newer
    /// generation is already published nothing is swapped and the call fails
    /// with `InvalidParameter`.
    pub fn rebuild(&self, cloud: &PointCloud, params: IndexParams) -> Result<Arc<Octree>> {
        let tree = Arc::new(Octree::build(cloud, params)?);
        if !self.publish(Arc::clone(&tree)) {
            return Err(Error::InvalidParameter(format!(
                "stale generation {}: a newer index is already published",
                tree.generation()
            )));
        }
        Ok(tree)
    }
}
