//! RDDL Grounding
//!
//! Converts between the lifted (parameter-indexed) model and dense tensor
//! storage.
//!
//! - [`ObjectUniverse`] gives every object a dense index within its type
//! - [`init`] builds the initial dense value of every pvariable
//! - [`align`] plans and memoizes the reshapes expressions need
//! - [`slicing`] fixes axes bound to literals
//! - [`TensorEngine::expand`] flattens a value back into grounded names
//!
//! The expression compiler and the simulator talk to all of this through
//! [`TensorEngine`].

pub mod align;
pub mod config;
pub mod debug_log;
pub mod engine;
pub mod error;
pub mod grounded;
pub mod init;
pub mod layout;
pub mod model;
pub mod signature;
pub mod slicing;
pub mod universe;

pub use align::{Transform, TransformCache, TransformKey, TransformOp};
pub use config::{DebugLogConfig, GroundingConfig};
pub use debug_log::{open_debug_log, DebugLog, FileDebugLog, NullDebugLog};
pub use engine::TensorEngine;
pub use error::{GroundingError, Result};
pub use grounded::GroundedName;
pub use layout::PVarLayout;
pub use model::{DeclaredValue, LiftedModel, PVarDecl, Role};
pub use signature::Signature;
pub use slicing::LiteralSlice;
pub use universe::ObjectUniverse;
