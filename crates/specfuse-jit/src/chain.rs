//! Fallback Chains
//!
//! Each call-site owns one chain of specialization slots, oldest first,
//! plus a lazily compiled baseline. The chain only grows, and never past the
//! strategy's total allowance.
//!
//! Concurrency: matching reads an `Arc` snapshot of the slot list and never
//! waits on compilation. Extension is serialized per chain by a mutex that
//! also guards the failure record; the slot list lock is taken only for the
//! copy-on-write append. A thread that loses the race to extend re-scans
//! after acquiring the mutex and reuses the winner's slot when it matches.
//!
//! Compile failures do not append a slot. After
//! [`MAX_FAILURES_PER_POSITION`] failures at one strategy position that
//! position is spent, so a compiler that keeps rejecting a kind costs a
//! bounded number of attempts and the failure record stays bounded.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;

use crate::compiler::NativeCompiler;
use crate::error::CompileError;
use crate::signature::ShapeSignature;
use crate::slot::SpecializationSlot;
use crate::strategy::{SharedStrategy, SpecializationKind};

/// Failed compilations tolerated at one strategy position before it is
/// given up.
pub const MAX_FAILURES_PER_POSITION: usize = 4;

/// Immutable snapshot of a chain's slots.
pub type SlotList<A> = Arc<Vec<Arc<SpecializationSlot<A>>>>;

/// Result of trying to extend a chain for a signature.
#[derive(Debug)]
pub enum Extension<A> {
    /// Another thread appended a matching slot while this one waited.
    Reused(Arc<SpecializationSlot<A>>),
    /// A new slot was compiled and appended.
    Appended(Arc<SpecializationSlot<A>>),
    /// The strategy allows no further slot.
    Exhausted,
    /// This (signature, kind) already failed to compile.
    KnownFailure(SpecializationKind),
    /// Compilation failed just now; nothing was appended.
    Failed(SpecializationKind, CompileError),
}

/// State owned by whichever thread is extending the chain.
#[derive(Debug, Default)]
struct ExtendState {
    /// Next strategy position: slots appended plus positions given up.
    position: usize,
    /// Failures recorded at `position`.
    position_failures: usize,
    /// (signature, kind) pairs that failed; at most
    /// `MAX_FAILURES_PER_POSITION` per position.
    failed: FxHashSet<(ShapeSignature, SpecializationKind)>,
}

/// Ordered fallback chain for one call-site.
pub struct FallbackChain<A> {
    slots: RwLock<SlotList<A>>,
    extend: Mutex<ExtendState>,
    failures: AtomicUsize,
    baseline: OnceCell<A>,
    exhausted: AtomicBool,
}

impl<A> FallbackChain<A> {
    /// Creates an empty chain with no baseline.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Arc::new(Vec::new())),
            extend: Mutex::new(ExtendState::default()),
            failures: AtomicUsize::new(0),
            baseline: OnceCell::new(),
            exhausted: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current slots.
    pub fn slots(&self) -> SlotList<A> {
        Arc::clone(&self.slots.read())
    }

    /// Number of compiled slots.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// True when no slot has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Earliest slot accepting `signature`, in creation order.
    pub fn find(&self, signature: &ShapeSignature) -> Option<Arc<SpecializationSlot<A>>> {
        let slots = self.slots();
        slots.iter().find(|slot| slot.matches(signature)).cloned()
    }

    /// Total compile failures seen by this chain. Never blocks on a
    /// compilation in progress.
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// True once the baseline has been compiled.
    pub fn has_baseline(&self) -> bool {
        self.baseline.get().is_some()
    }

    /// Returns the baseline, compiling it on first use.
    pub fn baseline<C>(&self, compiler: &C) -> &A
    where
        C: NativeCompiler<Artifact = A> + ?Sized,
    {
        self.baseline.get_or_init(|| compiler.compile_baseline())
    }

    /// Marks the chain exhausted; returns true only the first time.
    pub(crate) fn mark_exhausted(&self) -> bool {
        !self.exhausted.swap(true, Ordering::Relaxed)
    }

    /// Adds one slot for `signature`, if the strategy still allows it.
    ///
    /// The kind is read from the strategy active at the time the extension
    /// lock is held, at the chain's next unfilled position.
    pub fn extend<C>(
        &self,
        signature: &ShapeSignature,
        compiler: &C,
        strategy: &SharedStrategy,
    ) -> Extension<A>
    where
        C: NativeCompiler<Artifact = A> + ?Sized,
    {
        let mut state = self.extend.lock();

        // The chain may have grown while we waited for the lock.
        let current = self.slots();
        if let Some(slot) = current.iter().find(|slot| slot.matches(signature)) {
            return Extension::Reused(Arc::clone(slot));
        }

        let position = state.position;
        let Some(kind) = strategy.snapshot().kind_at(position) else {
            return Extension::Exhausted;
        };

        let key = (signature.clone(), kind);
        if state.failed.contains(&key) {
            return Extension::KnownFailure(kind);
        }

        match SpecializationSlot::compile(compiler, kind, signature, position) {
            Ok(slot) => {
                let slot = Arc::new(slot);
                let mut slots = self.slots.write();
                let mut next = Vec::with_capacity(slots.len() + 1);
                next.extend(slots.iter().cloned());
                next.push(Arc::clone(&slot));
                *slots = Arc::new(next);
                state.advance();
                Extension::Appended(slot)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                state.failed.insert(key);
                state.position_failures += 1;
                if state.position_failures >= MAX_FAILURES_PER_POSITION {
                    state.advance();
                }
                Extension::Failed(kind, err)
            }
        }
    }
}

impl ExtendState {
    fn advance(&mut self) {
        self.position += 1;
        self.position_failures = 0;
    }
}

impl<A> Default for FallbackChain<A> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::FusionStrategyTable;
    use crate::testing::{sig, MockArtifact, MockCompiler};

    fn strategy(pairs: &[(&str, i64)]) -> SharedStrategy {
        SharedStrategy::new(FusionStrategyTable::from_pairs(pairs).unwrap())
    }

    #[test]
    fn test_extend_until_exhausted() {
        let compiler = MockCompiler::new();
        let chain = FallbackChain::new();
        let strategy = strategy(&[("STATIC", 2)]);

        assert!(matches!(
            chain.extend(&sig(&[2, 2]), &compiler, &strategy),
            Extension::Appended(_)
        ));
        assert!(matches!(
            chain.extend(&sig(&[3, 3]), &compiler, &strategy),
            Extension::Appended(_)
        ));
        assert!(matches!(
            chain.extend(&sig(&[4, 4]), &compiler, &strategy),
            Extension::Exhausted
        ));
        assert_eq!(chain.len(), 2);
        assert_eq!(compiler.compilations(), 2);
    }

    #[test]
    fn test_extend_reuses_existing_match() {
        let compiler = MockCompiler::new();
        let chain = FallbackChain::new();
        let strategy = strategy(&[("STATIC", 4)]);

        chain.extend(&sig(&[2, 2]), &compiler, &strategy);
        match chain.extend(&sig(&[2, 2]), &compiler, &strategy) {
            Extension::Reused(slot) => assert_eq!(slot.depth(), 0),
            other => panic!("expected reuse, got {other:?}"),
        }
        assert_eq!(compiler.compilations(), 1);
    }

    #[test]
    fn test_find_earliest_match() {
        let compiler = MockCompiler::new();
        let chain = FallbackChain::new();
        let strategy = strategy(&[("DYNAMIC", 3)]);

        chain.extend(&sig(&[4, 4]), &compiler, &strategy);
        chain.extend(&sig(&[3, 5]), &compiler, &strategy);
        // [A, B] also accepts square shapes, but [A, A] came first.
        let slot = chain.find(&sig(&[8, 8])).unwrap();
        assert_eq!(slot.depth(), 0);
        assert_eq!(chain.find(&sig(&[8, 9])).unwrap().depth(), 1);
        assert!(chain.find(&sig(&[8])).is_none());
    }

    #[test]
    fn test_failure_not_appended_or_retried() {
        let compiler = MockCompiler::failing_on(|_, pattern| pattern.to_string().contains("[5, 5]"));
        let chain = FallbackChain::new();
        let strategy = strategy(&[("STATIC", 2)]);

        assert!(matches!(
            chain.extend(&sig(&[5, 5]), &compiler, &strategy),
            Extension::Failed(SpecializationKind::Static, _)
        ));
        assert!(chain.is_empty());
        assert_eq!(chain.failure_count(), 1);

        assert!(matches!(
            chain.extend(&sig(&[5, 5]), &compiler, &strategy),
            Extension::KnownFailure(SpecializationKind::Static)
        ));
        assert_eq!(compiler.attempts(), 1);

        // The depth was not consumed.
        assert!(matches!(
            chain.extend(&sig(&[2, 2]), &compiler, &strategy),
            Extension::Appended(ref slot) if slot.depth() == 0
        ));
    }

    #[test]
    fn test_repeated_failures_spend_position() {
        let compiler = MockCompiler::failing_on(|kind, _| kind == SpecializationKind::Dynamic);
        let chain = FallbackChain::new();
        let strategy = strategy(&[("DYNAMIC", 1)]);

        let mut failed = 0;
        for n in 2..1002 {
            match chain.extend(&sig(&[n, n + 1]), &compiler, &strategy) {
                Extension::Failed(SpecializationKind::Dynamic, _) => failed += 1,
                Extension::Exhausted => {}
                other => panic!("unexpected extension {other:?}"),
            }
        }
        assert_eq!(failed, MAX_FAILURES_PER_POSITION);
        assert_eq!(compiler.attempts(), MAX_FAILURES_PER_POSITION);
        assert_eq!(chain.failure_count(), MAX_FAILURES_PER_POSITION);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_spent_position_moves_to_next_kind() {
        let compiler = MockCompiler::failing_on(|kind, _| kind == SpecializationKind::Static);
        let chain = FallbackChain::new();
        let strategy = strategy(&[("STATIC", 1), ("DYNAMIC", 1)]);

        for n in 0..MAX_FAILURES_PER_POSITION {
            assert!(matches!(
                chain.extend(&sig(&[n + 2, 9]), &compiler, &strategy),
                Extension::Failed(SpecializationKind::Static, _)
            ));
        }
        match chain.extend(&sig(&[4, 4]), &compiler, &strategy) {
            Extension::Appended(slot) => {
                assert_eq!(slot.kind(), SpecializationKind::Dynamic);
                assert_eq!(slot.depth(), 1);
            }
            other => panic!("expected append, got {other:?}"),
        }
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_failure_count_readable_during_compile() {
        use std::sync::mpsc;
        use std::time::Duration;

        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = parking_lot::Mutex::new(entered_tx);
        let release_rx = parking_lot::Mutex::new(release_rx);
        let compiler = MockCompiler::failing_on(move |_, _| {
            let _ = entered_tx.lock().send(());
            let _ = release_rx.lock().recv_timeout(Duration::from_secs(5));
            true
        });
        let chain: FallbackChain<MockArtifact> = FallbackChain::new();
        let strategy = strategy(&[("STATIC", 1)]);

        std::thread::scope(|s| {
            let worker = s.spawn(|| chain.extend(&sig(&[2, 2]), &compiler, &strategy));
            entered_rx.recv().unwrap();
            // The extension lock is held by the compiling thread.
            assert_eq!(chain.failure_count(), 0);
            release_tx.send(()).unwrap();
            assert!(matches!(worker.join().unwrap(), Extension::Failed(..)));
        });
        assert_eq!(chain.failure_count(), 1);
    }

    #[test]
    fn test_baseline_compiled_once() {
        let compiler = MockCompiler::new();
        let chain: FallbackChain<MockArtifact> = FallbackChain::new();
        assert!(!chain.has_baseline());

        assert_eq!(*chain.baseline(&compiler), MockArtifact::Baseline);
        assert_eq!(*chain.baseline(&compiler), MockArtifact::Baseline);
        assert!(chain.has_baseline());
        assert_eq!(compiler.baselines(), 1);
    }

    #[test]
    fn test_strategy_change_applies_prospectively() {
        let compiler = MockCompiler::new();
        let chain = FallbackChain::new();
        let strategy = strategy(&[("STATIC", 1)]);

        chain.extend(&sig(&[2, 2]), &compiler, &strategy);
        strategy.replace(FusionStrategyTable::from_pairs(&[("DYNAMIC", 2)]).unwrap());

        match chain.extend(&sig(&[4, 4]), &compiler, &strategy) {
            Extension::Appended(slot) => {
                assert_eq!(slot.kind(), SpecializationKind::Dynamic);
                assert_eq!(slot.depth(), 1);
            }
            other => panic!("expected append, got {other:?}"),
        }
        // The existing slot keeps its kind.
        assert_eq!(chain.slots()[0].kind(), SpecializationKind::Static);

        strategy.replace(FusionStrategyTable::disabled());
        assert!(matches!(
            chain.extend(&sig(&[7, 9]), &compiler, &strategy),
            Extension::Exhausted
        ));
        assert_eq!(chain.len(), 2);
    }
}
