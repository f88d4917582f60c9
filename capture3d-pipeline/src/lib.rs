//! # capture3d
//!
//! Geometry pipeline behind the capture preview: raster frames become a point
//! cloud, the cloud is indexed and decimated into levels of detail, and loaded
//! meshes are simplified and repaired.
//!
//! ## Quick Start
//!
//! ```rust
//! use capture3d_pipeline::prelude::*;
//!
//! fn main() -> capture3d_core::Result<()> {
//!     let frames = vec![Frame::filled(8, 8, [200, 120, 40, 255])];
//!     let config = PipelineConfig::for_quality(QualityTier::High);
//!
//!     let cloud = build_point_cloud(&frames, None, &config.build)?;
//!     let index = build_index(&cloud, config.index.max_depth, config.index.max_points_per_leaf)?;
//!     let levels = generate_lod_levels(cloud, config.level_count())?;
//!     let active = select_active_level(&levels, 12.0)?;
//!
//!     assert_eq!(index.len(), 64);
//!     assert!(active.len() <= 64);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod pipeline;

pub use config::*;
pub use pipeline::*;

/// Convenient imports for common use cases
pub mod prelude {
    pub use crate::config::*;
    pub use crate::pipeline::*;
    pub use capture3d_algorithms::{
        BuildParams, FilterWorker, IdentityFilter, IndexParams, LodLevel, NoiseFilter, Octree,
        RadiusOutlierFilter, SamplerParams, SharedIndex,
    };
    pub use capture3d_core::{
        BoundingBox, Error, Frame, NearestNeighborSearch, Point, Point3f, PointCloud,
        SegmentationMask, TriangleMesh, Vector3f,
    };
}
