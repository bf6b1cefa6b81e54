//! RDDL Runtime.
//!
//! Drives a compiled model one step at a time.
//!
//! - [`store`] - the live value of every store key
//! - [`compiled`] - the function contract shared with the expression compiler
//! - [`levels`] - Level evaluation, sequential or on the rayon pool
//! - [`simulator`] - the [`Simulator`] state machine
//! - [`error`] - error types for runtime failures
//!
//! # Step Model
//!
//! 1. **Actions** - validate and merge the caller's actions over the no-op defaults
//! 2. **Levels** - evaluate CPFs Level by Level with a barrier between Levels
//! 3. **Reward** - sample the reward on the updated store
//! 4. **Advance** - copy each next-state value into its state slot
//! 5. **Observe** - expand the state (or observation fluents) to grounded names
//! 6. **Terminate** - evaluate termination conditions
//!
//! # Example
//!
//! ```ignore
//! use rddl_runtime::{Simulator, SimulatorConfig};
//!
//! let mut sim = Simulator::new(engine, compiled, SimulatorConfig::default(), RngStream::new(42))?;
//! sim.check_state_invariants()?;
//! let outcome = sim.step(&actions)?;
//! ```

pub mod compiled;
pub mod config;
pub mod error;
mod levels;
pub mod simulator;
pub mod store;

pub use compiled::{compiled, CompiledFn, CompiledModel, ErrorCode, Evaluation, Level};
pub use config::{LevelParallelConfig, SimulatorConfig};
pub use error::{Error, Result};
pub use simulator::{Actions, Observation, Simulator, Status, StepOutcome};
pub use store::Store;
