//! Specialization Slots
//!
//! A slot is one compiled variant in a fallback chain: the pattern it
//! accepts, the artifact the native compiler produced for it, and the chain
//! position it was created at. Slots never change after construction.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::fmt;

use crate::compiler::NativeCompiler;
use crate::error::CompileError;
use crate::signature::{ShapeSignature, SlotPattern};
use crate::strategy::SpecializationKind;

/// One compiled variant bound to a signature or symbolic pattern.
pub struct SpecializationSlot<A> {
    pattern: SlotPattern,
    artifact: A,
    depth: usize,
}

impl<A> SpecializationSlot<A> {
    /// Compiles a slot of `kind` for the triggering `signature`.
    pub fn compile<C>(
        compiler: &C,
        kind: SpecializationKind,
        signature: &ShapeSignature,
        depth: usize,
    ) -> Result<Self, CompileError>
    where
        C: NativeCompiler<Artifact = A> + ?Sized,
    {
        let pattern = SlotPattern::for_signature(kind, signature);
        let artifact = compiler.compile_specialized(kind, &pattern)?;
        Ok(Self {
            pattern,
            artifact,
            depth,
        })
    }

    /// Kind of this specialization.
    pub fn kind(&self) -> SpecializationKind {
        self.pattern.kind()
    }

    /// Pattern this slot accepts.
    pub fn pattern(&self) -> &SlotPattern {
        &self.pattern
    }

    /// Compiled artifact.
    pub fn artifact(&self) -> &A {
        &self.artifact
    }

    /// Chain position at which the slot was created.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true if `signature` may run this slot.
    pub fn matches(&self, signature: &ShapeSignature) -> bool {
        signature.matches(&self.pattern)
    }
}

impl<A> fmt::Debug for SpecializationSlot<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecializationSlot")
            .field("pattern", &self.pattern)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl<A> fmt::Display for SpecializationSlot<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.depth, self.pattern)
    }
}
