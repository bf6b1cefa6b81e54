//! Compiled-function contract.
//!
//! The expression compiler hands the simulator plain closures. Every one of
//! them has the same shape: read the store, consume the random-state token,
//! and return a value, the advanced token and an [`ErrorCode`]. Faults never
//! unwind; whether a fault is fatal is decided by the simulator's
//! [`ErrorPolicy`](rddl_foundation::ErrorPolicy).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use indexmap::IndexMap;

use rddl_foundation::{RngStream, Tensor};

use crate::store::Store;

/// Bitmask of numeric faults reported by a compiled function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ErrorCode(u32);

impl ErrorCode {
    pub const NONE: ErrorCode = ErrorCode(0);
    pub const NON_FINITE: ErrorCode = ErrorCode(1 << 0);
    pub const INVALID_CAST: ErrorCode = ErrorCode(1 << 1);
    pub const INT_DIVISION_BY_ZERO: ErrorCode = ErrorCode(1 << 2);
    pub const INDEX_OUT_OF_RANGE: ErrorCode = ErrorCode(1 << 3);
    pub const INVALID_DISTRIBUTION_PARAM: ErrorCode = ErrorCode(1 << 4);
    pub const UNSUPPORTED_OPERATION: ErrorCode = ErrorCode(1 << 5);
    pub const MISSING_VALUE: ErrorCode = ErrorCode(1 << 6);

    const MESSAGES: [(ErrorCode, &'static str); 7] = [
        (
            ErrorCode::NON_FINITE,
            "Found a NaN or infinite value in a real-valued computation.",
        ),
        (
            ErrorCode::INVALID_CAST,
            "Cast to a narrower type would lose information.",
        ),
        (
            ErrorCode::INT_DIVISION_BY_ZERO,
            "Integer division or modulo by zero.",
        ),
        (
            ErrorCode::INDEX_OUT_OF_RANGE,
            "Index or enum value out of range of its type.",
        ),
        (
            ErrorCode::INVALID_DISTRIBUTION_PARAM,
            "Invalid parameter passed to a probability distribution.",
        ),
        (
            ErrorCode::UNSUPPORTED_OPERATION,
            "Operation is not supported for the operand types.",
        ),
        (
            ErrorCode::MISSING_VALUE,
            "An operand was not found in the store.",
        ),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        ErrorCode(bits)
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: ErrorCode) -> bool {
        self.0 & other.0 == other.0
    }

    /// Descriptions of every set fault, in bit order.
    ///
    /// Bits without a known meaning are reported as a single extra message.
    pub fn messages(self) -> Vec<&'static str> {
        let mut known = 0;
        let mut messages: Vec<&'static str> = Self::MESSAGES
            .iter()
            .filter(|(code, _)| {
                known |= code.0;
                self.contains(*code)
            })
            .map(|(_, msg)| *msg)
            .collect();
        if self.0 & !known != 0 {
            messages.push("Unknown error code.");
        }
        messages
    }

    /// Numbered, newline-separated [`messages`](Self::messages).
    pub fn describe(self) -> String {
        self.messages()
            .iter()
            .enumerate()
            .map(|(i, msg)| format!("{}. {}", i + 1, msg))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl BitOr for ErrorCode {
    type Output = ErrorCode;

    fn bitor(self, rhs: ErrorCode) -> ErrorCode {
        ErrorCode(self.0 | rhs.0)
    }
}

impl BitOrAssign for ErrorCode {
    fn bitor_assign(&mut self, rhs: ErrorCode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Result of one compiled-function call.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Tensor,
    pub rng: RngStream,
    pub error: ErrorCode,
}

impl Evaluation {
    pub fn ok(value: Tensor, rng: RngStream) -> Self {
        Self {
            value,
            rng,
            error: ErrorCode::NONE,
        }
    }

    pub fn with_error(value: Tensor, rng: RngStream, error: ErrorCode) -> Self {
        Self { value, rng, error }
    }
}

/// A compiled invariant, precondition, termination, reward or CPF.
pub type CompiledFn = Arc<dyn Fn(&Store, RngStream) -> Evaluation + Send + Sync>;

/// Wrap a closure as a [`CompiledFn`].
pub fn compiled<F>(f: F) -> CompiledFn
where
    F: Fn(&Store, RngStream) -> Evaluation + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Store keys whose CPFs can be evaluated together.
pub type Level = Vec<String>;

/// Everything the expression compiler produces for one model.
#[derive(Clone)]
pub struct CompiledModel {
    pub invariants: Vec<CompiledFn>,
    pub preconditions: Vec<CompiledFn>,
    pub terminations: Vec<CompiledFn>,
    pub reward: CompiledFn,
    /// CPF of each derived store key.
    pub cpfs: IndexMap<String, CompiledFn>,
    /// Evaluation order of the CPFs.
    pub levels: Vec<Level>,
    /// State key to the derived key holding its next value.
    pub next_states: IndexMap<String, String>,
    /// Observation keys; empty when the state is fully observed.
    pub observ_fluents: Vec<String>,
}

impl CompiledModel {
    pub fn new(reward: CompiledFn) -> Self {
        Self {
            invariants: Vec::new(),
            preconditions: Vec::new(),
            terminations: Vec::new(),
            reward,
            cpfs: IndexMap::new(),
            levels: Vec::new(),
            next_states: IndexMap::new(),
            observ_fluents: Vec::new(),
        }
    }

    pub fn with_invariant(mut self, f: CompiledFn) -> Self {
        self.invariants.push(f);
        self
    }

    pub fn with_precondition(mut self, f: CompiledFn) -> Self {
        self.preconditions.push(f);
        self
    }

    pub fn with_termination(mut self, f: CompiledFn) -> Self {
        self.terminations.push(f);
        self
    }

    pub fn with_cpf(mut self, key: impl Into<String>, f: CompiledFn) -> Self {
        self.cpfs.insert(key.into(), f);
        self
    }

    pub fn with_level<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.levels.push(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_next_state(mut self, state: impl Into<String>, next: impl Into<String>) -> Self {
        self.next_states.insert(state.into(), next.into());
        self
    }

    pub fn with_observation(mut self, key: impl Into<String>) -> Self {
        self.observ_fluents.push(key.into());
        self
    }
}

impl fmt::Debug for CompiledModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModel")
            .field("invariants", &self.invariants.len())
            .field("preconditions", &self.preconditions.len())
            .field("terminations", &self.terminations.len())
            .field("cpfs", &self.cpfs.keys().collect::<Vec<_>>())
            .field("levels", &self.levels)
            .field("next_states", &self.next_states)
            .field("observ_fluents", &self.observ_fluents)
            .finish()
    }
}
