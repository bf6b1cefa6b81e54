//! Runtime errors for simulation execution.
//!
//! # Error Categories
//!
//! - **Domain constraints**: [`Error::StateInvariantViolation`],
//!   [`Error::ActionPreconditionViolation`]
//! - **Action input**: [`Error::UnknownAction`], [`Error::InvalidActionValue`]
//! - **Evaluation**: [`Error::Evaluation`], [`Error::InvalidOutput`]
//! - **Wiring**: [`Error::PVariableNotFound`], [`Error::InvalidModel`]
//!
//! # Error Handling Policy
//!
//! Constraint violations always reach the caller and are never retried; the
//! caller decides which actions to try next. Numeric faults reported by
//! compiled functions are promoted to [`Error::Evaluation`] only under
//! [`ErrorPolicy::Raise`](rddl_foundation::ErrorPolicy::Raise).

use rddl_foundation::TensorError;
use rddl_grounding::GroundingError;
use thiserror::Error;

/// Runtime result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a simulation.
#[derive(Debug, Error)]
pub enum Error {
    /// A state invariant evaluated to false. `index` is 0-based.
    #[error("invariant {} is not satisfied", .index + 1)]
    StateInvariantViolation { index: usize },

    /// An action precondition evaluated to false. `index` is 0-based.
    #[error("precondition {} is not satisfied", .index + 1)]
    ActionPreconditionViolation { index: usize },

    /// The caller supplied an action that is not a declared action-fluent
    /// grounding.
    #[error("<{name}> is not a valid action-fluent")]
    UnknownAction { name: String },

    /// The action value does not fit the action-fluent's range.
    #[error("invalid value for action <{name}>: {reason}")]
    InvalidActionValue { name: String, reason: String },

    /// A compiled function reported a numeric fault.
    ///
    /// `message` lists the decoded faults, one numbered line each.
    #[error("internal error in evaluation of {context}:\n{message}")]
    Evaluation { context: String, message: String },

    /// A compiled CPF produced a value that cannot be stored in its slot.
    #[error("invalid output for <{key}>: {reason}")]
    InvalidOutput { key: String, reason: String },

    /// A store key was referenced that holds no value.
    #[error("pvariable not found in store: {0}")]
    PVariableNotFound(String),

    /// The compiled artifacts disagree with the grounding.
    #[error("invalid compiled model: {0}")]
    InvalidModel(String),

    #[error(transparent)]
    Grounding(#[from] GroundingError),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}
