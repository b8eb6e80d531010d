//! JIT Error Types
//!
//! `JitError` is the only error a caller of the runtime ever sees.
//! `CompileError` comes back from the native compiler and is absorbed by the
//! dispatcher, which degrades to the baseline instead of failing the call.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use thiserror::Error;

use crate::strategy::SpecializationKind;

/// Result type for JIT control operations.
pub type JitResult<T> = Result<T, JitError>;

/// Errors surfaced by the JIT control plane.
#[derive(Error, Debug)]
pub enum JitError {
    /// Fusion strategy rejected (unknown kind or negative depth).
    #[error("Invalid fusion strategy: {0}")]
    InvalidStrategy(String),

    /// Fuser name is not one of fuser0, fuser1, fuser2.
    #[error("Unrecognized fuser option: {0}")]
    UnknownFuser(String),

    /// Debug state of a scripted function could not be reconstructed.
    #[error("Debug state unavailable: {0}")]
    DebugState(String),

    /// Configuration file content is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failure to build a specialized kernel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The graph contains an operation the fuser cannot handle.
    #[error("Unsupported operation for {kind} fusion: {op}")]
    UnsupportedOp {
        /// Specialization kind being compiled.
        kind: SpecializationKind,
        /// Offending operation.
        op: String,
    },

    /// Compilation hit a resource limit (registers, shared memory, time).
    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}
