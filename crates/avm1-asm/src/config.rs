//! Configuration for the disassembler and assembler.

use serde::{Deserialize, Serialize};

/// Default bound on function nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Disassembly configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisassemblerConfig {
    /// Run stack examination to annotate argument counts.
    /// Default: true
    pub examine_stack: bool,

    /// Maximum function nesting depth.
    /// Default: 64
    pub max_depth: usize,

    /// Unknown slots the simulated stack starts with, standing in for
    /// values pushed before the sequence runs.
    /// Default: 4
    pub seed_slots: usize,
}

impl Default for DisassemblerConfig {
    fn default() -> Self {
        Self {
            examine_stack: true,
            max_depth: DEFAULT_MAX_DEPTH,
            seed_slots: 4,
        }
    }
}

impl DisassemblerConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that skips stack examination.
    pub fn raw() -> Self {
        Self {
            examine_stack: false,
            ..Default::default()
        }
    }

    /// Enable or disable stack examination.
    pub fn with_examine_stack(mut self, examine_stack: bool) -> Self {
        self.examine_stack = examine_stack;
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the number of seed slots.
    pub fn with_seed_slots(mut self, seed_slots: usize) -> Self {
        self.seed_slots = seed_slots;
        self
    }
}

/// Assembly configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Maximum function nesting depth.
    /// Default: 64
    pub max_depth: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl AssemblerConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
