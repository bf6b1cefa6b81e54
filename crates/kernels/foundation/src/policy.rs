//! Evaluation fault policy.
//!
//! Compiled functions report soft numeric faults through an error code next
//! to their value. The policy decides whether the engine promotes such a
//! fault into a hard failure.

use serde::{Deserialize, Serialize};

/// Behavior when a compiled function reports a numeric fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Decode the fault and fail the current call.
    #[default]
    Raise,
    /// Log the decoded fault and continue with the produced value.
    Warn,
    /// Continue with the produced value without logging.
    Ignore,
}

impl ErrorPolicy {
    /// Whether a reported fault aborts the current call.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorPolicy::Raise)
    }
}
