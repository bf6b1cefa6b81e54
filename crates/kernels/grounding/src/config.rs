//! Grounding configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for building a [`TensorEngine`](crate::TensorEngine).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingConfig {
    /// Store one scalar per grounding instead of one tensor per pvariable.
    pub force_grounded: bool,
    /// Where to write the debug log; `None` disables it.
    pub debug_log: Option<DebugLogConfig>,
}

/// Debug log placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugLogConfig {
    /// Directory receiving `debug_<domain>_<instance>.txt`.
    pub dir: PathBuf,
}
