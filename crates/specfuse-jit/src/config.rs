//! Config - Fuser Configuration Files
//!
//! TOML form of the runtime knobs, so a deployment can pin its fusion
//! strategy and backend without code changes:
//!
//! ```toml
//! [executor]
//! fuser = "fuser1"
//! optimize = true
//!
//! [[strategy]]
//! kind = "STATIC"
//! depth = 2
//!
//! [[strategy]]
//! kind = "DYNAMIC"
//! depth = 10
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::JitContext;
use crate::error::{JitError, JitResult};
use crate::flags::FuserBackend;
use crate::strategy::FusionStrategyTable;

// =============================================================================
// Configuration
// =============================================================================

/// Fuser configuration (fuser.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuserConfig {
    /// Executor settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Fusion strategy entries, in order
    #[serde(default = "default_strategy")]
    pub strategy: Vec<StrategyEntryConfig>,
}

/// Executor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Fuser backend (fuser0, fuser1, fuser2); unset keeps the current one
    #[serde(default)]
    pub fuser: Option<String>,

    /// Run graph optimizations
    #[serde(default = "default_optimize")]
    pub optimize: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            fuser: None,
            optimize: default_optimize(),
        }
    }
}

fn default_optimize() -> bool {
    true
}

/// One `(kind, depth)` strategy entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyEntryConfig {
    /// STATIC or DYNAMIC
    pub kind: String,

    /// Number of specializations; negative values are rejected on apply
    pub depth: i64,
}

fn default_strategy() -> Vec<StrategyEntryConfig> {
    FusionStrategyTable::default()
        .to_pairs()
        .into_iter()
        .map(|(kind, depth)| StrategyEntryConfig {
            kind,
            depth: i64::try_from(depth).unwrap_or(i64::MAX),
        })
        .collect()
}

impl Default for FuserConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            strategy: default_strategy(),
        }
    }
}

impl FuserConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> JitResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> JitResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> JitResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| JitError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Strategy entries as `(kind, depth)` pairs.
    pub fn strategy_pairs(&self) -> Vec<(String, i64)> {
        self.strategy
            .iter()
            .map(|e| (e.kind.clone(), e.depth))
            .collect()
    }

    /// Validated fuser backend, if one is configured.
    pub fn backend(&self) -> JitResult<Option<FuserBackend>> {
        self.executor
            .fuser
            .as_deref()
            .map(str::parse::<FuserBackend>)
            .transpose()
    }

    /// Installs this configuration on `ctx`.
    ///
    /// Everything is validated first; on error the context is unchanged.
    /// Unlike the scoped guards, the changes are permanent.
    pub fn apply(&self, ctx: &JitContext) -> JitResult<()> {
        let table = FusionStrategyTable::from_pairs(&self.strategy_pairs())?;
        let backend = self.backend()?;

        let mut flags = ctx.flags();
        if let Some(backend) = backend {
            flags = backend.apply(flags);
        }
        flags.optimize = self.executor.optimize;

        info!(
            strategy = %table,
            fuser = backend.map(FuserBackend::name),
            optimize = flags.optimize,
            "applying fuser configuration"
        );
        ctx.strategy().replace(table);
        ctx.set_flags(flags);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
