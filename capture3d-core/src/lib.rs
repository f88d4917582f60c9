//! Core data structures and traits for capture3d
//!
//! This crate provides the plain geometry types shared by the capture
//! pipeline: raster frames, sampled points, point clouds, triangle meshes,
//! bounding boxes and the error taxonomy every stage reports through.

pub mod bounds;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod point;
pub mod point_cloud;
pub mod traits;

pub use bounds::*;
pub use error::*;
pub use frame::*;
pub use mesh::*;
pub use point::*;
pub use point_cloud::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
