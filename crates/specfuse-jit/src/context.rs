//! JIT Context
//!
//! The process-wide control plane: fusion strategy, executor flags and the
//! last executed optimized graph. It is an explicit handle, shared as
//! `Arc<JitContext>` by every dispatcher built on it.
//!
//! Scoped changes return guards that restore the previous value when
//! dropped, on every exit path including unwinding.
//!
//! # Example
//! ```rust
//! use specfuse_jit::JitContext;
//!
//! let ctx = JitContext::new();
//! ctx.set_fusion_strategy(&[("STATIC", 2), ("DYNAMIC", 2)]).unwrap();
//! {
//!     let _fuser = ctx.fuser("fuser1").unwrap();
//!     assert!(ctx.flags().texpr_fuser_enabled);
//! }
//! assert_eq!(ctx.get_fusion_strategy()[1], ("DYNAMIC".to_string(), 2));
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::debug::{graph_for, DebugGraph, DebugStateSource};
use crate::error::JitResult;
use crate::flags::{ExecutorFlags, FuserBackend};
use crate::strategy::{FusionStrategyTable, SharedStrategy};

// =============================================================================
// JitContext
// =============================================================================

/// Shared control-plane state for one JIT runtime.
#[derive(Debug, Default)]
pub struct JitContext {
    strategy: SharedStrategy,
    flags: RwLock<ExecutorFlags>,
    last_graph: Mutex<Option<DebugGraph>>,
}

impl JitContext {
    /// Creates a context with the default strategy and flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with the given strategy.
    pub fn with_strategy(table: FusionStrategyTable) -> Self {
        Self {
            strategy: SharedStrategy::new(table),
            ..Self::default()
        }
    }

    /// Shared strategy cell.
    pub fn strategy(&self) -> &SharedStrategy {
        &self.strategy
    }

    /// Validates and installs a new fusion strategy.
    ///
    /// On error the previous strategy stays active. Chains that already
    /// hold slots keep them; their next extension reads the new table.
    pub fn set_fusion_strategy<S: AsRef<str>>(&self, pairs: &[(S, i64)]) -> JitResult<()> {
        let table = FusionStrategyTable::from_pairs(pairs)?;
        info!(strategy = %table, "installing fusion strategy");
        self.strategy.replace(table);
        Ok(())
    }

    /// Active strategy as `(kind, depth)` pairs.
    pub fn get_fusion_strategy(&self) -> Vec<(String, usize)> {
        self.strategy.snapshot().to_pairs()
    }

    /// Installs a strategy until the returned guard is dropped.
    pub fn strategy_scope<S: AsRef<str>>(&self, pairs: &[(S, i64)]) -> JitResult<StrategyGuard<'_>> {
        let table = FusionStrategyTable::from_pairs(pairs)?;
        let previous = self.strategy.replace(table);
        Ok(StrategyGuard {
            ctx: self,
            previous: Some(previous),
        })
    }

    /// Current executor flags.
    pub fn flags(&self) -> ExecutorFlags {
        *self.flags.read()
    }

    /// Replaces the executor flags, returning the previous ones.
    pub fn set_flags(&self, flags: ExecutorFlags) -> ExecutorFlags {
        let previous = std::mem::replace(&mut *self.flags.write(), flags);
        if previous != flags {
            debug!(?previous, current = ?flags, "executor flags changed");
        }
        previous
    }

    fn update_flags<F>(&self, f: F) -> ExecutorFlags
    where
        F: FnOnce(ExecutorFlags) -> ExecutorFlags,
    {
        let mut flags = self.flags.write();
        let previous = *flags;
        let current = f(previous);
        *flags = current;
        debug!(?previous, ?current, "executor flags changed");
        previous
    }

    /// Switches to a fuser backend (`fuser0`, `fuser1` or `fuser2`) until
    /// the guard is dropped.
    pub fn fuser(&self, name: &str) -> JitResult<FuserGuard<'_>> {
        let backend: FuserBackend = name.parse()?;
        Ok(self.fuser_backend(backend))
    }

    /// Typed form of [`JitContext::fuser`].
    pub fn fuser_backend(&self, backend: FuserBackend) -> FuserGuard<'_> {
        let saved = self.update_flags(|flags| backend.apply(flags));
        FuserGuard {
            ctx: self,
            backend,
            saved,
        }
    }

    /// Enables or disables executor optimization until the guard is dropped.
    pub fn optimized_execution(&self, should_optimize: bool) -> OptimizedExecutionGuard<'_> {
        let saved = self.update_flags(|flags| ExecutorFlags {
            optimize: should_optimize,
            ..flags
        });
        OptimizedExecutionGuard {
            ctx: self,
            saved: saved.optimize,
        }
    }

    /// Records the optimized graph of the artifact that just ran.
    pub fn record_executed_graph(&self, graph: DebugGraph) {
        *self.last_graph.lock() = Some(graph);
    }

    /// Optimized graph of the most recent execution, if any was recorded.
    pub fn last_executed_optimized_graph(&self) -> Option<DebugGraph> {
        self.last_graph.lock().clone()
    }

    /// Optimized graph of a scripted function.
    ///
    /// When the debug state is ambiguous, runs `run` and returns the last
    /// executed optimized graph instead.
    pub fn graph_for<F>(&self, source: &dyn DebugStateSource, run: F) -> Option<DebugGraph>
    where
        F: FnOnce(),
    {
        graph_for(source, || {
            run();
            self.last_executed_optimized_graph()
        })
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Restores the fuser flags on drop.
#[must_use = "the fuser is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FuserGuard<'a> {
    ctx: &'a JitContext,
    backend: FuserBackend,
    saved: ExecutorFlags,
}

impl FuserGuard<'_> {
    /// Backend active while the guard lives.
    pub fn backend(&self) -> FuserBackend {
        self.backend
    }
}

impl Drop for FuserGuard<'_> {
    fn drop(&mut self) {
        let (backend, saved) = (self.backend, self.saved);
        self.ctx.update_flags(|current| backend.restore(saved, current));
    }
}

/// Restores the optimize flag on drop.
#[must_use = "optimization is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct OptimizedExecutionGuard<'a> {
    ctx: &'a JitContext,
    saved: bool,
}

impl Drop for OptimizedExecutionGuard<'_> {
    fn drop(&mut self) {
        let saved = self.saved;
        self.ctx.update_flags(|flags| ExecutorFlags {
            optimize: saved,
            ..flags
        });
    }
}

/// Restores the previous fusion strategy on drop.
#[must_use = "the strategy is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct StrategyGuard<'a> {
    ctx: &'a JitContext,
    previous: Option<Arc<FusionStrategyTable>>,
}

impl Drop for StrategyGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.ctx.strategy.install(previous);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
