//! Error types for capture3d

use thiserror::Error;

/// Main error type for capture3d operations
///
/// Every variant is a local, synchronous failure of a single call. Inputs are
/// never mutated before an error is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Frame dimensions do not match its pixel buffer
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Two rasters that must share a size do not
    #[error(
        "Frame size mismatch: expected {}x{}, got {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    FrameSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Nothing to process (no frames, no points)
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A parameter is zero, negative, non-finite or out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A mesh operation needs triangle indices but the mesh has none
    #[error("Mesh has no triangle index buffer")]
    UnindexedMesh,

    /// A background request was abandoned before it produced a result
    #[error("Request cancelled")]
    Cancelled,
}

/// Result type alias for capture3d operations
pub type Result<T> = std::result::Result<T, Error>;
