//! Simulator configuration.

use serde::{Deserialize, Serialize};

use rddl_foundation::ErrorPolicy;

/// Configuration for a [`Simulator`](crate::Simulator).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// What to do when a compiled function reports a numeric fault.
    pub error_policy: ErrorPolicy,
    pub parallel: LevelParallelConfig,
}

/// Configuration for Level parallelism
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelParallelConfig {
    pub enabled: bool,
    /// Minimum number of Level members to trigger parallel evaluation.
    /// Below this threshold, members evaluate sequentially to avoid overhead.
    pub parallel_threshold: usize,
}

impl Default for LevelParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // Default: parallelize when there are 4+ members
            parallel_threshold: 4,
        }
    }
}

impl LevelParallelConfig {
    /// Always evaluate sequentially.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn use_parallel(&self, members: usize) -> bool {
        self.enabled && members >= self.parallel_threshold
    }
}
