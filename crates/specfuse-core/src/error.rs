//! Error Types - Tensor Metadata Errors
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while building tensor metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Stride vector length differs from the number of dimensions.
    #[error("Rank mismatch: {dims} dims but {strides} strides")]
    RankMismatch {
        /// Number of dimensions.
        dims: usize,
        /// Number of strides.
        strides: usize,
    },

    /// Device string could not be parsed.
    #[error("Invalid device: {0}")]
    InvalidDevice(String),
}

/// Result type for metadata operations.
pub type Result<T> = core::result::Result<T, Error>;
