//! RDDL Foundation
//!
//! Core primitives shared by the grounding engine and the simulator:
//! typed identifiers, scalar values and ranges, dense tensors, the
//! deterministic random-state token, and the evaluation fault policy.

pub mod ids;
pub mod policy;
pub mod rng;
pub mod tensor;
pub mod value;

pub use ids::{ObjectId, PVarId, TypeId, VarLabel};
pub use policy::ErrorPolicy;
pub use rng::RngStream;
pub use tensor::{AxisSelector, Tensor, TensorData, TensorError};
pub use value::{DType, Value, ValueRange};
