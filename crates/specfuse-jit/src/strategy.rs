//! Fusion Strategy
//!
//! The strategy table says how many specializations of each kind a call-site
//! may compile, and in which order. `[("STATIC", 2), ("DYNAMIC", 2)]` means
//! the first two specializations are exact-shape kernels, the next two are
//! symbolic-shape kernels, and anything after that runs the unfused baseline.
//!
//! The table is process-wide state shared through [`SharedStrategy`]:
//! readers take an `Arc` snapshot, writers replace the table wholesale.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{JitError, JitResult};

// =============================================================================
// Specialization Kind
// =============================================================================

/// How a compiled variant is bound to its input shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecializationKind {
    /// Compiled for one exact input signature.
    Static,
    /// Compiled for a symbolic shape pattern.
    Dynamic,
}

impl SpecializationKind {
    /// Returns the canonical upper-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "STATIC",
            Self::Dynamic => "DYNAMIC",
        }
    }
}

impl fmt::Display for SpecializationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecializationKind {
    type Err = JitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STATIC" => Ok(Self::Static),
            "DYNAMIC" => Ok(Self::Dynamic),
            other => Err(JitError::InvalidStrategy(format!(
                "unknown specialization kind '{other}', expected STATIC or DYNAMIC"
            ))),
        }
    }
}

// =============================================================================
// Strategy Table
// =============================================================================

/// One `(kind, depth)` entry of a strategy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyEntry {
    /// Kind of the specializations this entry allows.
    pub kind: SpecializationKind,
    /// Number of specializations of that kind.
    pub depth: usize,
}

impl StrategyEntry {
    /// Creates an entry.
    pub const fn new(kind: SpecializationKind, depth: usize) -> Self {
        Self { kind, depth }
    }
}

/// Ordered list of specialization allowances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionStrategyTable {
    entries: Vec<StrategyEntry>,
}

impl FusionStrategyTable {
    /// Creates a table from already validated entries.
    pub fn new(entries: Vec<StrategyEntry>) -> Self {
        Self { entries }
    }

    /// Parses `(kind, depth)` pairs as accepted by `set_fusion_strategy`.
    ///
    /// Every pair is validated before anything is built, so a bad entry
    /// anywhere in the list rejects the whole table.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[(S, i64)]) -> JitResult<Self> {
        let mut entries = Vec::with_capacity(pairs.len());
        for (index, (kind, depth)) in pairs.iter().enumerate() {
            let kind: SpecializationKind = kind.as_ref().parse()?;
            let depth = usize::try_from(*depth).map_err(|_| {
                JitError::InvalidStrategy(format!(
                    "entry {index} ({kind}) has negative depth {depth}"
                ))
            })?;
            entries.push(StrategyEntry::new(kind, depth));
        }
        Ok(Self::new(entries))
    }

    /// A table that allows no specialization at all.
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the entries in order.
    pub fn entries(&self) -> &[StrategyEntry] {
        &self.entries
    }

    /// Total number of specializations a call-site may compile.
    pub fn total_specializations(&self) -> usize {
        self.entries
            .iter()
            .fold(0usize, |acc, e| acc.saturating_add(e.depth))
    }

    /// Kind of the specialization at chain position `position` (0-based),
    /// or `None` once the budget is spent.
    pub fn kind_at(&self, position: usize) -> Option<SpecializationKind> {
        let mut remaining = position;
        for entry in &self.entries {
            if remaining < entry.depth {
                return Some(entry.kind);
            }
            remaining -= entry.depth;
        }
        None
    }

    /// Returns the table as `(kind, depth)` pairs.
    pub fn to_pairs(&self) -> Vec<(String, usize)> {
        self.entries
            .iter()
            .map(|e| (e.kind.as_str().to_string(), e.depth))
            .collect()
    }
}

impl Default for FusionStrategyTable {
    fn default() -> Self {
        Self::new(vec![
            StrategyEntry::new(SpecializationKind::Static, 2),
            StrategyEntry::new(SpecializationKind::Dynamic, 10),
        ])
    }
}

impl fmt::Display for FusionStrategyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({}, {})", e.kind, e.depth)?;
        }
        write!(f, "]")
    }
}

// =============================================================================
// Shared Strategy
// =============================================================================

/// Process-wide, atomically replaceable strategy table.
#[derive(Debug, Default)]
pub struct SharedStrategy {
    current: RwLock<Arc<FusionStrategyTable>>,
}

impl SharedStrategy {
    /// Creates a shared cell holding `table`.
    pub fn new(table: FusionStrategyTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    /// Consistent snapshot of the active table.
    pub fn snapshot(&self) -> Arc<FusionStrategyTable> {
        Arc::clone(&self.current.read())
    }

    /// Installs `table` and returns the one it replaced.
    pub fn replace(&self, table: FusionStrategyTable) -> Arc<FusionStrategyTable> {
        self.install(Arc::new(table))
    }

    /// Installs a shared table and returns the one it replaced.
    pub fn install(&self, table: Arc<FusionStrategyTable>) -> Arc<FusionStrategyTable> {
        std::mem::replace(&mut *self.current.write(), table)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let table = FusionStrategyTable::from_pairs(&[("STATIC", 2), ("DYNAMIC", 3)]).unwrap();
        assert_eq!(table.total_specializations(), 5);
        assert_eq!(
            table.to_pairs(),
            vec![("STATIC".to_string(), 2), ("DYNAMIC".to_string(), 3)]
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = FusionStrategyTable::from_pairs(&[("STATIC", 1), ("static", 1)]).unwrap_err();
        assert!(matches!(err, JitError::InvalidStrategy(_)));
    }

    #[test]
    fn test_negative_depth_rejected() {
        let err = FusionStrategyTable::from_pairs(&[("DYNAMIC", -1)]).unwrap_err();
        assert!(err.to_string().contains("negative depth"));
    }

    #[test]
    fn test_kind_at() {
        let table = FusionStrategyTable::from_pairs(&[
            ("STATIC", 2),
            ("DYNAMIC", 0),
            ("DYNAMIC", 1),
            ("STATIC", 1),
        ])
        .unwrap();
        assert_eq!(table.kind_at(0), Some(SpecializationKind::Static));
        assert_eq!(table.kind_at(1), Some(SpecializationKind::Static));
        assert_eq!(table.kind_at(2), Some(SpecializationKind::Dynamic));
        assert_eq!(table.kind_at(3), Some(SpecializationKind::Static));
        assert_eq!(table.kind_at(4), None);
    }

    #[test]
    fn test_disabled_table() {
        let table = FusionStrategyTable::disabled();
        assert_eq!(table.total_specializations(), 0);
        assert_eq!(table.kind_at(0), None);
    }

    #[test]
    fn test_shared_replace() {
        let shared = SharedStrategy::default();
        let before = shared.snapshot();
        assert_eq!(*before, FusionStrategyTable::default());

        let old = shared.replace(FusionStrategyTable::disabled());
        assert_eq!(old, before);
        // Earlier snapshots are unaffected by the replacement.
        assert_eq!(before.total_specializations(), 12);
        assert_eq!(shared.snapshot().total_specializations(), 0);
    }

    #[test]
    fn test_display() {
        let table = FusionStrategyTable::from_pairs(&[("STATIC", 1)]).unwrap();
        assert_eq!(table.to_string(), "[(STATIC, 1)]");
    }
}
