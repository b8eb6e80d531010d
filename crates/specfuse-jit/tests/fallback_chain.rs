//! End-to-end fallback chain behavior through the dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use specfuse_jit::{
    CallSiteRegistry, CompileError, DType, Device, DispatchOutcome, Dispatcher, JitContext,
    JitError, NativeCompiler, SlotPattern, SpecializationKind, TensorMeta,
};

/// Compiler whose artifacts are the text of the pattern they were built for.
#[derive(Default)]
struct RecordingCompiler {
    specialized: AtomicUsize,
    baselines: AtomicUsize,
}

impl NativeCompiler for RecordingCompiler {
    type Artifact = String;
    type Input = TensorMeta;
    type Output = String;

    fn compile_specialized(
        &self,
        _kind: SpecializationKind,
        pattern: &SlotPattern,
    ) -> Result<String, CompileError> {
        self.specialized.fetch_add(1, Ordering::SeqCst);
        Ok(pattern.to_string())
    }

    fn compile_baseline(&self) -> String {
        self.baselines.fetch_add(1, Ordering::SeqCst);
        "baseline".to_string()
    }

    fn execute(&self, artifact: &String, _inputs: &[TensorMeta]) -> String {
        artifact.clone()
    }
}

fn setup(pairs: &[(&str, i64)]) -> (Dispatcher<RecordingCompiler>, Arc<RecordingCompiler>) {
    let ctx = Arc::new(JitContext::new());
    ctx.set_fusion_strategy(pairs).unwrap();
    let compiler = Arc::new(RecordingCompiler::default());
    (Dispatcher::new("fn", Arc::clone(&compiler), ctx), compiler)
}

fn call(d: &Dispatcher<RecordingCompiler>, dims: &[usize]) -> (String, DispatchOutcome) {
    d.call_with_outcome(&[TensorMeta::f32(dims)])
}

#[test]
fn test_static_then_dynamic_then_baseline() {
    let (d, compiler) = setup(&[("STATIC", 2), ("DYNAMIC", 2)]);

    let (out, outcome) = call(&d, &[2, 2]);
    assert_eq!(out, "STATIC(f32[2, 2]@cpu)");
    assert_eq!(
        outcome,
        DispatchOutcome::Extended {
            depth: 0,
            kind: SpecializationKind::Static
        }
    );

    let (out, _) = call(&d, &[3, 3]);
    assert_eq!(out, "STATIC(f32[3, 3]@cpu)");

    let (out, outcome) = call(&d, &[4, 4]);
    assert_eq!(out, "DYNAMIC(f32[A, A]@cpu)");
    assert_eq!(
        outcome,
        DispatchOutcome::Extended {
            depth: 2,
            kind: SpecializationKind::Dynamic
        }
    );

    let (out, _) = call(&d, &[3, 5]);
    assert_eq!(out, "DYNAMIC(f32[A, B]@cpu)");
    assert_eq!(d.chain().len(), 4);

    // Unrelated sizes of any value run the [A, B] kernel.
    let (out, outcome) = call(&d, &[6, 7]);
    assert_eq!(out, "DYNAMIC(f32[A, B]@cpu)");
    assert_eq!(outcome, DispatchOutcome::Matched { depth: 3 });

    // Nothing accepts a rank-3 input and the budget is spent.
    let (out, outcome) = call(&d, &[6, 7, 8]);
    assert_eq!(out, "baseline");
    assert_eq!(outcome, DispatchOutcome::Exhausted);
    assert_eq!(d.chain().len(), 4);

    // Square shapes of any size reuse the symbolic slot.
    let (out, outcome) = call(&d, &[8, 8]);
    assert_eq!(out, "DYNAMIC(f32[A, A]@cpu)");
    assert_eq!(outcome, DispatchOutcome::Matched { depth: 2 });

    // The earliest match wins even when a later slot also accepts.
    let (_, outcome) = call(&d, &[3, 3]);
    assert_eq!(outcome, DispatchOutcome::Matched { depth: 1 });

    assert_eq!(compiler.specialized.load(Ordering::SeqCst), 4);
    assert_eq!(compiler.baselines.load(Ordering::SeqCst), 1);
}

#[test]
fn test_repeated_signature_compiles_once() {
    let (d, compiler) = setup(&[("STATIC", 3)]);
    for _ in 0..10 {
        call(&d, &[16, 32]);
    }
    assert_eq!(compiler.specialized.load(Ordering::SeqCst), 1);
    assert_eq!(d.stats().hits, 9);
}

#[test]
fn test_static_never_matches_other_shapes() {
    let (d, _) = setup(&[("STATIC", 1)]);
    call(&d, &[2, 3]);

    let shapes: [&[usize]; 4] = [&[2, 4], &[3, 3], &[2, 3, 1], &[6]];
    for dims in shapes {
        let (out, outcome) = call(&d, dims);
        assert_eq!(out, "baseline", "{dims:?}");
        assert_eq!(outcome, DispatchOutcome::Exhausted);
    }
}

#[test]
fn test_static_distinguishes_dtype_and_device() {
    let (d, _) = setup(&[("STATIC", 1)]);
    call(&d, &[4, 4]);

    let f64_input = TensorMeta::contiguous(&[4, 4], DType::F64, Device::Cpu);
    let (_, outcome) = d.call_with_outcome(&[f64_input]);
    assert_eq!(outcome, DispatchOutcome::Exhausted);

    let gpu_input = TensorMeta::contiguous(&[4, 4], DType::F32, Device::Cuda(0));
    let (_, outcome) = d.call_with_outcome(&[gpu_input]);
    assert_eq!(outcome, DispatchOutcome::Exhausted);
}

#[test]
fn test_dynamic_class_equality_across_inputs() {
    let (d, _) = setup(&[("DYNAMIC", 1)]);
    let pair = |a: &[usize], b: &[usize]| {
        d.call_with_outcome(&[TensorMeta::f32(a), TensorMeta::f32(b)])
    };

    let (out, _) = pair(&[8, 16], &[16, 8]);
    assert_eq!(out, "DYNAMIC(f32[A, B]@cpu, f32[B, A]@cpu)");

    let (_, outcome) = pair(&[3, 5], &[5, 3]);
    assert_eq!(outcome, DispatchOutcome::Matched { depth: 0 });

    // Breaks the assumed equality between the inputs.
    let (_, outcome) = pair(&[3, 5], &[3, 5]);
    assert_eq!(outcome, DispatchOutcome::Exhausted);

    // Size 1 would broadcast; it never binds a symbolic class.
    let (_, outcome) = pair(&[1, 5], &[5, 1]);
    assert_eq!(outcome, DispatchOutcome::Exhausted);
}

#[test]
fn test_zero_depth_always_runs_baseline() {
    let (d, compiler) = setup(&[("STATIC", 0)]);
    for n in 2..6 {
        let (out, _) = call(&d, &[n, n]);
        assert_eq!(out, "baseline");
    }
    assert!(d.chain().is_empty());
    assert_eq!(compiler.specialized.load(Ordering::SeqCst), 0);
}

#[test]
fn test_chain_bounded_by_budget() {
    let (d, compiler) = setup(&[("STATIC", 2), ("DYNAMIC", 1), ("STATIC", 1)]);
    // Every rank is a new signature for both kinds.
    for rank in 1..40 {
        call(&d, &vec![2; rank]);
    }
    assert_eq!(d.chain().len(), 4);
    assert_eq!(compiler.specialized.load(Ordering::SeqCst), 4);
}

#[test]
fn test_dynamic_slot_serves_same_structure_with_new_values() {
    let (d, compiler) = setup(&[("DYNAMIC", 1)]);
    let pair = |a: &[usize], b: &[usize]| {
        d.call_with_outcome(&[TensorMeta::f32(a), TensorMeta::f32(b)])
    };

    let (out, _) = pair(&[2, 3, 4], &[3, 4, 5]);
    assert_eq!(out, "DYNAMIC(f32[A, B, C]@cpu, f32[B, C, D]@cpu)");

    let (out, outcome) = pair(&[7, 8, 9], &[8, 9, 10]);
    assert_eq!(out, "DYNAMIC(f32[A, B, C]@cpu, f32[B, C, D]@cpu)");
    assert_eq!(outcome, DispatchOutcome::Matched { depth: 0 });
    assert_eq!(compiler.specialized.load(Ordering::SeqCst), 1);
}

#[test]
fn test_invalid_strategy_keeps_previous_table() {
    let ctx = JitContext::new();
    ctx.set_fusion_strategy(&[("STATIC", 2), ("DYNAMIC", 2)]).unwrap();

    let err = ctx
        .set_fusion_strategy(&[("DYNAMIC", 1), ("SYMBOLIC", 3)])
        .unwrap_err();
    assert!(matches!(err, JitError::InvalidStrategy(_)));
    assert_eq!(
        ctx.get_fusion_strategy(),
        vec![("STATIC".to_string(), 2), ("DYNAMIC".to_string(), 2)]
    );
}

#[test]
fn test_strategy_change_affects_later_extensions_only() {
    let ctx = Arc::new(JitContext::new());
    ctx.set_fusion_strategy(&[("STATIC", 1)]).unwrap();
    let registry = CallSiteRegistry::new(Arc::new(RecordingCompiler::default()), ctx);
    let site = registry.call_site("forward");

    site.call(&[TensorMeta::f32(&[2, 2])]);
    let (_, outcome) = site.call_with_outcome(&[TensorMeta::f32(&[9, 9])]);
    assert_eq!(outcome, DispatchOutcome::Exhausted);

    registry
        .context()
        .set_fusion_strategy(&[("STATIC", 1), ("DYNAMIC", 1)])
        .unwrap();
    let (out, outcome) = site.call_with_outcome(&[TensorMeta::f32(&[9, 9])]);
    assert_eq!(out, "DYNAMIC(f32[A, A]@cpu)");
    assert_eq!(
        outcome,
        DispatchOutcome::Extended {
            depth: 1,
            kind: SpecializationKind::Dynamic
        }
    );
    assert_eq!(site.chain().slots()[0].kind(), SpecializationKind::Static);
}
