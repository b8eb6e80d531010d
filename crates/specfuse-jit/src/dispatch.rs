//! Dispatcher
//!
//! Per-call-site decision procedure. On every invocation the dispatcher
//! computes the input signature and moves through three states:
//!
//! 1. **Match**: the earliest slot accepting the signature runs.
//! 2. **Extend**: no slot matches and the strategy still has room, so the
//!    next slot is compiled (kind taken from the strategy at the chain's
//!    current length), appended and run.
//! 3. **Exhausted**: nothing matches and the budget is spent; the lazily
//!    compiled baseline runs.
//!
//! Compile failures are never surfaced: the call runs the baseline and the
//! failure is remembered so the same (signature, kind) is not retried.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info, trace, warn};

use crate::chain::{Extension, FallbackChain};
use crate::compiler::NativeCompiler;
use crate::context::JitContext;
use crate::signature::ShapeSignature;
use crate::slot::SpecializationSlot;
use crate::strategy::SpecializationKind;

// =============================================================================
// Call-Site Identity
// =============================================================================

/// Name of a logical call-site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSiteId(Arc<str>);

impl CallSiteId {
    /// Creates an id.
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallSiteId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for CallSiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// How one invocation was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An existing slot matched.
    Matched {
        /// Chain position of the slot.
        depth: usize,
    },
    /// A new slot was compiled for this call.
    Extended {
        /// Chain position of the new slot.
        depth: usize,
        /// Its kind.
        kind: SpecializationKind,
    },
    /// The strategy budget is spent; baseline ran.
    Exhausted,
    /// Compilation failed during this call; baseline ran.
    CompileFailed {
        /// Kind that failed.
        kind: SpecializationKind,
    },
    /// Compilation failed on an earlier call; baseline ran.
    KnownFailure {
        /// Kind that failed.
        kind: SpecializationKind,
    },
    /// Optimization is disabled on the executor; baseline ran.
    Unoptimized,
}

impl DispatchOutcome {
    /// Returns true if a specialized slot ran.
    pub fn is_specialized(self) -> bool {
        matches!(self, Self::Matched { .. } | Self::Extended { .. })
    }
}

/// Artifact chosen for a call.
#[derive(Debug)]
pub enum Target<'a, A> {
    /// A specialized slot.
    Slot(Arc<SpecializationSlot<A>>),
    /// The call-site's baseline.
    Baseline(&'a A),
}

impl<A> Target<'_, A> {
    /// The artifact to execute.
    pub fn artifact(&self) -> &A {
        match self {
            Self::Slot(slot) => slot.artifact(),
            Self::Baseline(artifact) => artifact,
        }
    }

    /// The slot, when a specialized variant was chosen.
    pub fn slot(&self) -> Option<&Arc<SpecializationSlot<A>>> {
        match self {
            Self::Slot(slot) => Some(slot),
            Self::Baseline(_) => None,
        }
    }
}

/// Decision for one call: what to run and why.
#[derive(Debug)]
pub struct Dispatch<'a, A> {
    /// Artifact to run.
    pub target: Target<'a, A>,
    /// How it was chosen.
    pub outcome: DispatchOutcome,
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicUsize,
    compilations: AtomicUsize,
    compile_failures: AtomicUsize,
    baseline_runs: AtomicUsize,
}

/// Dispatch statistics for one call-site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Calls served by an existing slot.
    pub hits: usize,
    /// Slots compiled.
    pub compilations: usize,
    /// Failed slot compilations.
    pub compile_failures: usize,
    /// Calls that ran the baseline.
    pub baseline_runs: usize,
}

impl DispatchStats {
    /// Fraction of calls that ran a specialized slot, in percent.
    pub fn specialized_ratio(&self) -> f64 {
        let specialized = self.hits + self.compilations;
        let total = specialized + self.baseline_runs;
        if total == 0 {
            0.0
        } else {
            (specialized as f64 / total as f64) * 100.0
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Chooses and runs the compiled variant for one call-site.
pub struct Dispatcher<C: NativeCompiler> {
    id: CallSiteId,
    compiler: Arc<C>,
    context: Arc<JitContext>,
    chain: FallbackChain<C::Artifact>,
    counters: Counters,
}

impl<C: NativeCompiler> Dispatcher<C> {
    /// Creates a dispatcher with an empty chain.
    pub fn new(id: impl Into<CallSiteId>, compiler: Arc<C>, context: Arc<JitContext>) -> Self {
        Self {
            id: id.into(),
            compiler,
            context,
            chain: FallbackChain::new(),
            counters: Counters::default(),
        }
    }

    /// Call-site id.
    pub fn id(&self) -> &CallSiteId {
        &self.id
    }

    /// The fallback chain.
    pub fn chain(&self) -> &FallbackChain<C::Artifact> {
        &self.chain
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            compilations: self.counters.compilations.load(Ordering::Relaxed),
            compile_failures: self.counters.compile_failures.load(Ordering::Relaxed),
            baseline_runs: self.counters.baseline_runs.load(Ordering::Relaxed),
        }
    }

    /// Decides what to run for `inputs` without running it.
    pub fn dispatch(&self, inputs: &[C::Input]) -> Dispatch<'_, C::Artifact> {
        self.dispatch_signature(&ShapeSignature::from_inputs(inputs))
    }

    /// Decides what to run for an already computed signature.
    pub fn dispatch_signature(&self, signature: &ShapeSignature) -> Dispatch<'_, C::Artifact> {
        if !self.context.flags().optimize {
            return self.baseline(DispatchOutcome::Unoptimized);
        }

        if let Some(slot) = self.chain.find(signature) {
            trace!(call_site = %self.id, depth = slot.depth(), "specialization hit");
            return self.matched(slot);
        }

        let compiler: &C = &self.compiler;
        match self.chain.extend(signature, compiler, self.context.strategy()) {
            Extension::Reused(slot) => self.matched(slot),
            Extension::Appended(slot) => {
                self.counters.compilations.fetch_add(1, Ordering::Relaxed);
                let (depth, kind) = (slot.depth(), slot.kind());
                debug!(
                    call_site = %self.id,
                    depth,
                    %kind,
                    pattern = %slot.pattern(),
                    "compiled specialization"
                );
                Dispatch {
                    target: Target::Slot(slot),
                    outcome: DispatchOutcome::Extended { depth, kind },
                }
            }
            Extension::Exhausted => {
                if self.chain.mark_exhausted() {
                    info!(
                        call_site = %self.id,
                        slots = self.chain.len(),
                        "specialization budget exhausted, using unfused baseline"
                    );
                }
                self.baseline(DispatchOutcome::Exhausted)
            }
            Extension::KnownFailure(kind) => self.baseline(DispatchOutcome::KnownFailure { kind }),
            Extension::Failed(kind, err) => {
                self.counters.compile_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    call_site = %self.id,
                    %kind,
                    %signature,
                    error = %err,
                    "specialization failed, falling back to baseline"
                );
                self.baseline(DispatchOutcome::CompileFailed { kind })
            }
        }
    }

    /// Runs the compiled function on `inputs`.
    pub fn call(&self, inputs: &[C::Input]) -> C::Output {
        self.call_with_outcome(inputs).0
    }

    /// Runs the compiled function and reports how the call was dispatched.
    pub fn call_with_outcome(&self, inputs: &[C::Input]) -> (C::Output, DispatchOutcome) {
        let dispatch = self.dispatch(inputs);
        let artifact = dispatch.target.artifact();
        let output = self.compiler.execute(artifact, inputs);
        if let Some(graph) = self.compiler.optimized_graph(artifact) {
            self.context.record_executed_graph(graph);
        }
        (output, dispatch.outcome)
    }

    fn matched(&self, slot: Arc<SpecializationSlot<C::Artifact>>) -> Dispatch<'_, C::Artifact> {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        let depth = slot.depth();
        Dispatch {
            target: Target::Slot(slot),
            outcome: DispatchOutcome::Matched { depth },
        }
    }

    fn baseline(&self, outcome: DispatchOutcome) -> Dispatch<'_, C::Artifact> {
        self.counters.baseline_runs.fetch_add(1, Ordering::Relaxed);
        let compiler: &C = &self.compiler;
        Dispatch {
            target: Target::Baseline(self.chain.baseline(compiler)),
            outcome,
        }
    }
}

impl<C: NativeCompiler> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.id)
            .field("slots", &self.chain.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Call-Site Registry
// =============================================================================

/// Dispatchers for all call-sites sharing one compiler and context.
pub struct CallSiteRegistry<C: NativeCompiler> {
    compiler: Arc<C>,
    context: Arc<JitContext>,
    sites: RwLock<FxHashMap<CallSiteId, Arc<Dispatcher<C>>>>,
}

impl<C: NativeCompiler> CallSiteRegistry<C> {
    /// Creates an empty registry.
    pub fn new(compiler: Arc<C>, context: Arc<JitContext>) -> Self {
        Self {
            compiler,
            context,
            sites: RwLock::new(FxHashMap::default()),
        }
    }

    /// Shared context.
    pub fn context(&self) -> &Arc<JitContext> {
        &self.context
    }

    /// Dispatcher for `id`, created on first use.
    pub fn call_site(&self, id: impl Into<CallSiteId>) -> Arc<Dispatcher<C>> {
        let id = id.into();
        if let Some(site) = self.sites.read().get(&id) {
            return Arc::clone(site);
        }

        let mut sites = self.sites.write();
        let site = sites.entry(id.clone()).or_insert_with(|| {
            Arc::new(Dispatcher::new(
                id,
                Arc::clone(&self.compiler),
                Arc::clone(&self.context),
            ))
        });
        Arc::clone(site)
    }

    /// Existing dispatcher for `id`.
    pub fn get(&self, id: &CallSiteId) -> Option<Arc<Dispatcher<C>>> {
        self.sites.read().get(id).cloned()
    }

    /// Number of known call-sites.
    pub fn len(&self) -> usize {
        self.sites.read().len()
    }

    /// True when no call-site has been used yet.
    pub fn is_empty(&self) -> bool {
        self.sites.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
