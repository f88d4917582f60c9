//! # capture3d algorithms
//!
//! The point-cloud half of the capture pipeline: sampling raster frames into
//! points, estimating coarse motion for video input, assembling clouds,
//! indexing them with an octree, filtering noise and producing
//! level-of-detail copies for the renderer.

pub mod builder;
pub mod filtering;
pub mod lod;
pub mod motion;
pub mod octree;
pub mod sampling;

// Re-export commonly used items
pub use builder::*;
pub use filtering::*;
pub use lod::*;
pub use motion::*;
pub use octree::*;
pub use sampling::*;
