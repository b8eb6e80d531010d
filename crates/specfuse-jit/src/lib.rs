//! Specfuse JIT - Shape Specialization and Fusion Fallback
//!
//! Decides, per call-site, which compiled variant of a fused function runs
//! for a given set of input shapes. Variants are compiled on demand in the
//! order the fusion strategy dictates (exact-shape STATIC kernels first,
//! symbolic-shape DYNAMIC kernels next) until the budget is spent, after
//! which the unfused baseline runs.
//!
//! # Key Features
//! - Process-wide fusion strategy with validated, atomic replacement
//! - Per-call-site fallback chains that only grow and never recompile
//! - Scoped guards for fuser backend, optimization and strategy
//! - Optimized graph extraction for debugging
//! - TOML configuration
//!
//! # Example
//! ```rust
//! use specfuse_jit::{JitContext, SpecializationKind};
//!
//! let ctx = JitContext::new();
//! ctx.set_fusion_strategy(&[("STATIC", 1), ("DYNAMIC", 1)]).unwrap();
//!
//! let table = ctx.strategy().snapshot();
//! assert_eq!(table.kind_at(0), Some(SpecializationKind::Static));
//! assert_eq!(table.kind_at(1), Some(SpecializationKind::Dynamic));
//! assert_eq!(table.kind_at(2), None);
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// Modules
// =============================================================================

pub mod chain;
pub mod compiler;
pub mod config;
pub mod context;
pub mod debug;
pub mod dispatch;
pub mod error;
pub mod flags;
pub mod signature;
pub mod slot;
pub mod strategy;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use chain::{Extension, FallbackChain, MAX_FAILURES_PER_POSITION};
pub use compiler::NativeCompiler;
pub use config::FuserConfig;
pub use context::{FuserGuard, JitContext, OptimizedExecutionGuard, StrategyGuard};
pub use debug::{graph_for, try_graph_for, DebugGraph, DebugStateSource};
pub use dispatch::{
    CallSiteId, CallSiteRegistry, Dispatch, DispatchOutcome, DispatchStats, Dispatcher, Target,
};
pub use error::{CompileError, JitError, JitResult};
pub use flags::{ExecutorFlags, FuserBackend};
pub use signature::{ShapeSignature, SlotPattern, SymbolicPattern, TensorSignature};
pub use slot::SpecializationSlot;
pub use strategy::{FusionStrategyTable, SharedStrategy, SpecializationKind, StrategyEntry};
pub use specfuse_core::{DType, Device, StrideClass, TensorDescriptor, TensorMeta};
