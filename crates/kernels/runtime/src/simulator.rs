//! Simulation engine
//!
//! The [`Simulator`] owns the live store and the random-state token for one
//! trajectory. A step merges the caller's actions, evaluates the CPFs Level by
//! Level, samples the reward, advances the state fluents and reports the
//! observation and whether a terminal state was reached.
//!
//! `Terminated` is informational: callers may keep stepping past it.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, instrument, trace, warn};

use rddl_foundation::{ErrorPolicy, RngStream, Tensor, Value};
use rddl_grounding::{DeclaredValue, GroundedName, Role, TensorEngine};

use crate::compiled::{CompiledFn, CompiledModel, ErrorCode, Evaluation};
use crate::config::SimulatorConfig;
use crate::error::{Error, Result};
use crate::levels::{evaluate_level, ResolvedLevel};
use crate::store::Store;

/// Actions supplied by the caller, keyed by grounded name.
pub type Actions = IndexMap<String, DeclaredValue>;

/// Externally visible values, keyed by grounded name.
pub type Observation = IndexMap<String, Value>;

/// Lifecycle state of a simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Stepping,
    Terminated,
}

/// Result of one [`Simulator::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
}

/// Compiled simulation of one (domain, instance).
pub struct Simulator {
    engine: Arc<TensorEngine>,
    model: CompiledModel,
    levels: Vec<ResolvedLevel>,
    config: SimulatorConfig,
    store: Store,
    rng: RngStream,
    noop_actions: IndexMap<String, Tensor>,
    state_keys: Vec<String>,
    state: Observation,
    status: Status,
}

impl Simulator {
    /// Create a simulator over `engine`'s initial values.
    ///
    /// Fails with [`Error::InvalidModel`] when a Level names a key without a
    /// CPF, or when the compiled artifacts reference keys the store lacks.
    pub fn new(
        engine: Arc<TensorEngine>,
        model: CompiledModel,
        config: SimulatorConfig,
        rng: RngStream,
    ) -> Result<Self> {
        let store = Store::new(engine.init_values().clone());

        let mut levels = Vec::with_capacity(model.levels.len());
        for level in &model.levels {
            let mut members = Vec::with_capacity(level.len());
            for key in level {
                let cpf = model.cpfs.get(key).ok_or_else(|| {
                    Error::InvalidModel(format!("level member <{}> has no CPF", key))
                })?;
                if !store.contains(key) {
                    return Err(Error::InvalidModel(format!(
                        "CPF output <{}> has no store slot",
                        key
                    )));
                }
                members.push((key.clone(), Arc::clone(cpf)));
            }
            levels.push(ResolvedLevel { members });
        }
        for (state, next) in &model.next_states {
            if !store.contains(state) || !store.contains(next) {
                return Err(Error::InvalidModel(format!(
                    "next-state pair <{}> -> <{}> is not in the store",
                    state, next
                )));
            }
        }
        if let Some(key) = model.observ_fluents.iter().find(|k| !store.contains(k)) {
            return Err(Error::InvalidModel(format!("observation <{}> is not in the store", key)));
        }

        let noop_actions = engine
            .keys_with_role(Role::ActionFluent)
            .into_iter()
            .map(|key| -> Result<(String, Tensor)> {
                let value = store.require(&key)?.clone();
                Ok((key, value))
            })
            .collect::<Result<IndexMap<_, _>>>()?;
        let state_keys = engine.keys_with_role(Role::StateFluent);

        info!(
            domain = engine.domain(),
            instance = engine.instance(),
            levels = levels.len(),
            cpfs = model.cpfs.len(),
            pomdp = !model.observ_fluents.is_empty(),
            error_policy = ?config.error_policy,
            "simulator created"
        );

        let mut sim = Self {
            engine,
            model,
            levels,
            config,
            store,
            rng,
            noop_actions,
            state_keys,
            state: Observation::new(),
            status: Status::Ready,
        };
        sim.state = sim.expand_keys(&sim.state_keys)?;
        Ok(sim)
    }

    pub fn engine(&self) -> &TensorEngine {
        &self.engine
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Current random-state token.
    pub fn rng(&self) -> RngStream {
        self.rng
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Externally visible state after the last step or reset.
    pub fn state(&self) -> &Observation {
        &self.state
    }

    /// Whether observations are drawn from observation fluents.
    pub fn is_pomdp(&self) -> bool {
        !self.model.observ_fluents.is_empty()
    }

    /// Default value of every action key.
    pub fn noop_actions(&self) -> &IndexMap<String, Tensor> {
        &self.noop_actions
    }

    /// Restore the initial store and return the initial observation.
    ///
    /// The random-state token is not rewound.
    pub fn reset(&mut self) -> Result<Observation> {
        self.store = Store::new(self.engine.init_values().clone());
        self.state = self.expand_keys(&self.state_keys)?;
        self.status = Status::Ready;
        debug!("simulator reset");
        self.observation()
    }

    /// Fail with the first invariant that does not hold.
    pub fn check_state_invariants(&mut self) -> Result<()> {
        for i in 0..self.model.invariants.len() {
            let f = Arc::clone(&self.model.invariants[i]);
            let holds = self.evaluate_condition(&f, None, || format!("invariant {}", i + 1))?;
            if !holds {
                return Err(Error::StateInvariantViolation { index: i });
            }
        }
        Ok(())
    }

    /// Fail with the first precondition that does not hold for `actions`.
    ///
    /// Actions are checked against a scratch copy of the store; the store
    /// itself is never modified. Only the random-state token advances.
    pub fn check_action_preconditions(&mut self, actions: &Actions) -> Result<()> {
        let merged = self.merged_store(actions)?;
        for i in 0..self.model.preconditions.len() {
            let f = Arc::clone(&self.model.preconditions[i]);
            let holds =
                self.evaluate_condition(&f, Some(&merged), || format!("precondition {}", i + 1))?;
            if !holds {
                return Err(Error::ActionPreconditionViolation { index: i });
            }
        }
        Ok(())
    }

    /// Whether any termination condition holds, checked in declaration order.
    pub fn check_terminal_states(&mut self) -> Result<bool> {
        for i in 0..self.model.terminations.len() {
            let f = Arc::clone(&self.model.terminations[i]);
            if self.evaluate_condition(&f, None, || format!("termination {}", i + 1))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Sample the reward for the current store.
    pub fn sample_reward(&mut self) -> Result<f64> {
        let f = Arc::clone(&self.model.reward);
        let value = self.evaluate(&f, None, || "reward function".to_string())?;
        value
            .to_scalar()
            .map(|v| v.as_real())
            .ok_or_else(|| Error::InvalidOutput {
                key: "reward".to_string(),
                reason: format!("expected a scalar, got shape {:?}", value.shape()),
            })
    }

    /// Advance the simulation by one step.
    #[instrument(skip_all, fields(actions = actions.len()))]
    pub fn step(&mut self, actions: &Actions) -> Result<StepOutcome> {
        let merged = self.process_actions(actions)?;
        for (key, value) in merged {
            self.store.set(&key, value)?;
        }
        self.status = Status::Stepping;

        for index in 0..self.levels.len() {
            let (results, rng) = evaluate_level(
                &self.levels[index],
                &self.store,
                self.rng,
                &self.config.parallel,
            );
            self.rng = rng;
            for (member, evaluation) in results.into_iter().enumerate() {
                let key = self.levels[index].members[member].0.clone();
                self.commit_cpf(&key, evaluation)?;
            }
            trace!(level = index, "level resolved");
        }

        let reward = self.sample_reward()?;

        for (state, next) in &self.model.next_states {
            let value = self.store.require(next)?.clone();
            self.store.set(state, value)?;
        }
        self.state = self.expand_keys(&self.state_keys)?;
        let observation = self.observation()?;

        let done = self.check_terminal_states()?;
        self.status = if done { Status::Terminated } else { Status::Ready };
        debug!(reward, done, "step complete");
        Ok(StepOutcome {
            observation,
            reward,
            done,
        })
    }

    fn observation(&self) -> Result<Observation> {
        if self.is_pomdp() {
            self.expand_keys(&self.model.observ_fluents)
        } else {
            Ok(self.state.clone())
        }
    }

    fn expand_keys(&self, keys: &[String]) -> Result<Observation> {
        let mut out = Observation::new();
        for key in keys {
            let value = self.store.require(key)?;
            for (name, v) in self.engine.expand(key, value)? {
                out.insert(name.to_string(), v);
            }
        }
        Ok(out)
    }

    /// Validate `actions` and scatter them over the no-op defaults.
    ///
    /// Returns the full value of every action key.
    fn process_actions(&self, actions: &Actions) -> Result<IndexMap<String, Tensor>> {
        let mut merged = self.noop_actions.clone();
        let mut seen = HashSet::new();
        for (raw, declared) in actions {
            let unknown = || Error::UnknownAction { name: raw.clone() };
            let name = GroundedName::parse(raw).map_err(|_| unknown())?;
            let layout = self.engine.layout(name.pvar.as_str()).map_err(|_| unknown())?;
            if layout.role != Role::ActionFluent {
                return Err(unknown());
            }
            let (key, coords) = self.engine.resolve_grounded(&name).map_err(|_| unknown())?;
            let value = self
                .engine
                .resolve_value(&name, declared)
                .map_err(|e| Error::InvalidActionValue {
                    name: raw.clone(),
                    reason: e.to_string(),
                })?;
            if !seen.insert(name.to_string()) {
                warn!(action = %name, "action supplied more than once; last value wins");
            }
            let slot = merged
                .get_mut(&key)
                .ok_or_else(|| Error::PVariableNotFound(key.clone()))?;
            slot.set(&coords, value)?;
        }
        Ok(merged)
    }

    fn merged_store(&self, actions: &Actions) -> Result<Store> {
        let mut merged = self.store.clone();
        for (key, value) in self.process_actions(actions)? {
            merged.set(&key, value)?;
        }
        Ok(merged)
    }

    /// Call `f` on `store` (or the live store), thread the token and apply
    /// the error policy.
    fn evaluate(
        &mut self,
        f: &CompiledFn,
        store: Option<&Store>,
        context: impl FnOnce() -> String,
    ) -> Result<Tensor> {
        let Evaluation { value, rng, error } = f(store.unwrap_or(&self.store), self.rng);
        self.rng = rng;
        self.handle_error_code(error, context)?;
        Ok(value)
    }

    fn evaluate_condition(
        &mut self,
        f: &CompiledFn,
        store: Option<&Store>,
        context: impl FnOnce() -> String,
    ) -> Result<bool> {
        let value = self.evaluate(f, store, context)?;
        let holds = value.values().all(|v| v.is_truthy());
        Ok(holds)
    }

    fn handle_error_code(&self, error: ErrorCode, context: impl FnOnce() -> String) -> Result<()> {
        if error.is_ok() {
            return Ok(());
        }
        match self.config.error_policy {
            ErrorPolicy::Raise => Err(Error::Evaluation {
                context: context(),
                message: error.describe(),
            }),
            ErrorPolicy::Warn => {
                warn!(
                    context = %context(),
                    code = %error,
                    faults = ?error.messages(),
                    "evaluation fault"
                );
                Ok(())
            }
            ErrorPolicy::Ignore => Ok(()),
        }
    }

    /// Store a CPF result after checking its fault code, dtype and shape.
    ///
    /// Values are cast to the slot's dtype. A value of the wrong shape fails
    /// under [`ErrorPolicy::Raise`]; otherwise the slot keeps its previous
    /// value.
    fn commit_cpf(&mut self, key: &str, evaluation: Evaluation) -> Result<()> {
        self.handle_error_code(evaluation.error, || format!("CPF <{}>", key))?;
        let previous = self.store.require(key)?;
        if evaluation.value.shape() != previous.shape() {
            let reason = format!(
                "expected shape {:?}, got {:?}",
                previous.shape(),
                evaluation.value.shape()
            );
            if self.config.error_policy.is_fatal() {
                return Err(Error::InvalidOutput {
                    key: key.to_string(),
                    reason,
                });
            }
            if self.config.error_policy == ErrorPolicy::Warn {
                warn!(key, %reason, "keeping previous value");
            }
            return Ok(());
        }
        let value = evaluation.value.cast(previous.dtype());
        self.store.set(key, value)
    }
}
