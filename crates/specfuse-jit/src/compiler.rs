//! Native Compiler Boundary
//!
//! The specialization engine never generates code itself. Everything that
//! touches kernels goes through [`NativeCompiler`]: compile a specialized
//! variant for a pattern, compile the unfused baseline, run an artifact.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use specfuse_core::TensorDescriptor;

use crate::debug::DebugGraph;
use crate::error::CompileError;
use crate::signature::SlotPattern;
use crate::strategy::SpecializationKind;

/// Opaque interface to the native JIT compiler.
///
/// Compilation is synchronous and may be slow; the dispatcher calls
/// `compile_specialized` at most once per missing chain position and never
/// speculatively.
pub trait NativeCompiler: Send + Sync {
    /// Handle to a compiled kernel.
    type Artifact: Send + Sync;
    /// Kernel input (must expose its metadata).
    type Input: TensorDescriptor;
    /// Kernel result.
    type Output;

    /// Compiles a variant specialized for `pattern`.
    fn compile_specialized(
        &self,
        kind: SpecializationKind,
        pattern: &SlotPattern,
    ) -> Result<Self::Artifact, CompileError>;

    /// Compiles the unfused, unspecialized implementation.
    fn compile_baseline(&self) -> Self::Artifact;

    /// Runs a compiled artifact.
    fn execute(&self, artifact: &Self::Artifact, inputs: &[Self::Input]) -> Self::Output;

    /// Optimized graph behind an artifact, for debugging.
    fn optimized_graph(&self, _artifact: &Self::Artifact) -> Option<DebugGraph> {
        None
    }
}
