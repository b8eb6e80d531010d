//! Executor Flags
//!
//! Switches on the graph executor: which fusers may run, whether the
//! profiling executor is used, and whether optimization (and with it
//! specialization) happens at all.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::fmt;
use std::str::FromStr;

use crate::error::JitError;

// =============================================================================
// Fuser Backend
// =============================================================================

/// Fusion backend selectable with `JitContext::fuser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuserBackend {
    /// `fuser0`: legacy fuser only.
    Legacy,
    /// `fuser1`: NNC tensor-expression fuser only.
    TensorExpr,
    /// `fuser2`: nvFuser only.
    NvFuser,
}

impl FuserBackend {
    /// Returns the option name accepted by `FromStr`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Legacy => "fuser0",
            Self::TensorExpr => "fuser1",
            Self::NvFuser => "fuser2",
        }
    }

    /// Flags with this backend switched on and the others off.
    ///
    /// The tensor-expression fuser needs the profiling executor, so selecting
    /// it also turns on profiling executor and profiling mode.
    pub fn apply(self, flags: ExecutorFlags) -> ExecutorFlags {
        match self {
            Self::Legacy => ExecutorFlags {
                can_fuse_on_cpu: true,
                can_fuse_on_gpu: true,
                texpr_fuser_enabled: false,
                nvfuser_enabled: false,
                ..flags
            },
            Self::TensorExpr => ExecutorFlags {
                can_fuse_on_cpu: false,
                can_fuse_on_gpu: true,
                texpr_fuser_enabled: true,
                nvfuser_enabled: false,
                profiling_executor: true,
                profiling_mode: true,
                ..flags
            },
            Self::NvFuser => ExecutorFlags {
                can_fuse_on_cpu: false,
                can_fuse_on_gpu: false,
                texpr_fuser_enabled: false,
                nvfuser_enabled: true,
                ..flags
            },
        }
    }

    /// Puts back the fields `apply` changed, taking them from `saved`.
    ///
    /// Fields `apply` does not touch keep their value from `current`.
    pub fn restore(self, saved: ExecutorFlags, current: ExecutorFlags) -> ExecutorFlags {
        let restored = ExecutorFlags {
            can_fuse_on_cpu: saved.can_fuse_on_cpu,
            can_fuse_on_gpu: saved.can_fuse_on_gpu,
            texpr_fuser_enabled: saved.texpr_fuser_enabled,
            nvfuser_enabled: saved.nvfuser_enabled,
            ..current
        };
        match self {
            Self::TensorExpr => ExecutorFlags {
                profiling_executor: saved.profiling_executor,
                profiling_mode: saved.profiling_mode,
                ..restored
            },
            Self::Legacy | Self::NvFuser => restored,
        }
    }
}

impl fmt::Display for FuserBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FuserBackend {
    type Err = JitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fuser0" => Ok(Self::Legacy),
            "fuser1" => Ok(Self::TensorExpr),
            "fuser2" => Ok(Self::NvFuser),
            other => Err(JitError::UnknownFuser(other.to_string())),
        }
    }
}

// =============================================================================
// Executor Flags
// =============================================================================

/// Process-wide executor switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorFlags {
    /// Legacy fuser may fuse CPU kernels.
    pub can_fuse_on_cpu: bool,
    /// Legacy fuser may fuse GPU kernels.
    pub can_fuse_on_gpu: bool,
    /// Tensor-expression (NNC) fuser enabled.
    pub texpr_fuser_enabled: bool,
    /// nvFuser enabled.
    pub nvfuser_enabled: bool,
    /// Use the profiling graph executor.
    pub profiling_executor: bool,
    /// Record shapes in profiling runs.
    pub profiling_mode: bool,
    /// Run graph optimizations (and specialization) before execution.
    pub optimize: bool,
}

impl Default for ExecutorFlags {
    fn default() -> Self {
        Self {
            can_fuse_on_cpu: false,
            can_fuse_on_gpu: true,
            texpr_fuser_enabled: true,
            nvfuser_enabled: false,
            profiling_executor: true,
            profiling_mode: true,
            optimize: true,
        }
    }
}
