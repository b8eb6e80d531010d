//! In-crate test compiler.

use std::sync::atomic::{AtomicUsize, Ordering};

use specfuse_core::TensorMeta;

use crate::compiler::NativeCompiler;
use crate::debug::DebugGraph;
use crate::error::CompileError;
use crate::signature::{ShapeSignature, SlotPattern};
use crate::strategy::SpecializationKind;

type FailPredicate = Box<dyn Fn(SpecializationKind, &SlotPattern) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MockArtifact {
    Specialized { id: usize, pattern: String },
    Baseline,
}

pub(crate) struct MockCompiler {
    attempts: AtomicUsize,
    compiled: AtomicUsize,
    baselines: AtomicUsize,
    executions: AtomicUsize,
    fail_when: Option<FailPredicate>,
}

impl MockCompiler {
    pub(crate) fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            compiled: AtomicUsize::new(0),
            baselines: AtomicUsize::new(0),
            executions: AtomicUsize::new(0),
            fail_when: None,
        }
    }

    pub(crate) fn failing_on<F>(predicate: F) -> Self
    where
        F: Fn(SpecializationKind, &SlotPattern) -> bool + Send + Sync + 'static,
    {
        Self {
            fail_when: Some(Box::new(predicate)),
            ..Self::new()
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn compilations(&self) -> usize {
        self.compiled.load(Ordering::SeqCst)
    }

    pub(crate) fn baselines(&self) -> usize {
        self.baselines.load(Ordering::SeqCst)
    }

    pub(crate) fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl NativeCompiler for MockCompiler {
    type Artifact = MockArtifact;
    type Input = TensorMeta;
    type Output = MockArtifact;

    fn compile_specialized(
        &self,
        kind: SpecializationKind,
        pattern: &SlotPattern,
    ) -> Result<MockArtifact, CompileError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_when.as_ref().is_some_and(|f| f(kind, pattern)) {
            return Err(CompileError::UnsupportedOp {
                kind,
                op: "mock::unsupported".to_string(),
            });
        }
        let id = self.compiled.fetch_add(1, Ordering::SeqCst);
        Ok(MockArtifact::Specialized {
            id,
            pattern: pattern.to_string(),
        })
    }

    fn compile_baseline(&self) -> MockArtifact {
        self.baselines.fetch_add(1, Ordering::SeqCst);
        MockArtifact::Baseline
    }

    fn execute(&self, artifact: &MockArtifact, _inputs: &[TensorMeta]) -> MockArtifact {
        self.executions.fetch_add(1, Ordering::SeqCst);
        artifact.clone()
    }

    fn optimized_graph(&self, artifact: &MockArtifact) -> Option<DebugGraph> {
        let mut graph = DebugGraph::new();
        let kind = match artifact {
            MockArtifact::Specialized { .. } => "prim::TensorExprGroup",
            MockArtifact::Baseline => "aten::add",
        };
        graph.add_node(graph.root(), kind);
        Some(graph)
    }
}

/// Signature of a single contiguous f32 CPU tensor.
pub(crate) fn sig(dims: &[usize]) -> ShapeSignature {
    ShapeSignature::from_inputs(&[TensorMeta::f32(dims)])
}

pub(crate) fn meta(dims: &[usize]) -> TensorMeta {
    TensorMeta::f32(dims)
}
