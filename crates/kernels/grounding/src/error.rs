//! Grounding errors.
//!
//! # Error Categories
//!
//! - **Construction**: [`GroundingError::ObjectResolution`],
//!   [`GroundingError::TypeDeclaration`], [`GroundingError::UnknownType`],
//!   [`GroundingError::UnknownPVariable`], [`GroundingError::InvalidValue`]
//! - **Alignment**: [`GroundingError::Arity`],
//!   [`GroundingError::SignatureTypeMismatch`],
//!   [`GroundingError::UnresolvedParameter`],
//!   [`GroundingError::CardinalityMismatch`], [`GroundingError::ShapeMismatch`]
//!
//! Construction errors abort building the engine. Alignment errors are fatal to
//! the compile step that requested the inconsistent shape; the engine never
//! recovers from them on its own.

use rddl_foundation::{ObjectId, PVarId, TensorError, TypeId, VarLabel};
use thiserror::Error;

/// Grounding result type alias.
pub type Result<T> = std::result::Result<T, GroundingError>;

/// Errors raised while building or using the grounding engine.
#[derive(Debug, Error)]
pub enum GroundingError {
    /// An object or enum literal does not belong to the type it is used as.
    #[error("object <{object}> does not resolve in type <{type_id}>: {reason}")]
    ObjectResolution {
        object: ObjectId,
        type_id: TypeId,
        reason: String,
    },

    /// A pvariable's declared range is neither a primitive nor an enum type,
    /// or an enum type was declared without being a type.
    #[error("type <{range}> of <{subject}> is not valid: {reason}")]
    TypeDeclaration {
        subject: String,
        range: String,
        reason: String,
    },

    #[error("type <{0}> is not declared")]
    UnknownType(TypeId),

    #[error("pvariable <{0}> is not declared")]
    UnknownPVariable(PVarId),

    /// A declared value cannot be stored in its pvariable's range.
    #[error("invalid value for <{name}>: {reason}")]
    InvalidValue { name: String, reason: String },

    /// An invocation supplied the wrong number of parameters.
    #[error("pvariable <{pvar}> requires {expected} parameters, got {found}")]
    Arity {
        pvar: PVarId,
        expected: usize,
        found: usize,
    },

    /// A parameter is bound to something of a different type than declared.
    #[error(
        "argument {position} of pvariable <{pvar}> expects type <{expected}>, \
         got <{argument}> of type <{found}>"
    )]
    SignatureTypeMismatch {
        pvar: PVarId,
        /// 1-based argument position.
        position: usize,
        expected: TypeId,
        argument: String,
        found: TypeId,
    },

    /// Free variables of an invocation have no axis in the target signature.
    #[error("pvariable <{pvar}> has unresolved parameter(s) {labels:?}")]
    UnresolvedParameter { pvar: PVarId, labels: Vec<VarLabel> },

    /// A value array holds a different number of elements than groundings.
    #[error("value array of size {found} is not compatible with <{pvar}> ({expected} groundings)")]
    CardinalityMismatch {
        pvar: PVarId,
        expected: usize,
        found: usize,
    },

    /// A cached transform was applied to an array of the wrong shape.
    #[error("transform expects input shape {expected:?}, got {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("invalid grounded name <{name}>: {reason}")]
    InvalidGroundedName { name: String, reason: String },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("debug log I/O error: {0}")]
    Io(#[from] std::io::Error),
}
