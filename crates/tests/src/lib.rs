//! Integration test harness for the RDDL kernels.
//!
//! Provides a small HVAC model (heaters warming adjacent zones) together with
//! a hand-written stand-in for the expression compiler. The stand-in binds
//! every operand the way a real compiler would: literal slicing first, then
//! alignment to the signature of the enclosing expression, both through
//! [`TensorEngine`]. The resulting closures follow the compiled-function
//! contract of [`rddl_runtime`].

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use rddl_foundation::{ErrorPolicy, ObjectId, RngStream, Tensor, TypeId, Value, VarLabel};
use rddl_grounding::{
    DeclaredValue, GroundingConfig, GroundingError, LiftedModel, LiteralSlice, NullDebugLog, Role,
    Signature, TensorEngine, Transform,
};
use rddl_runtime::{
    compiled, Actions, CompiledModel, ErrorCode, Evaluation, LevelParallelConfig, Simulator,
    SimulatorConfig, StepOutcome, Store,
};

/// Route kernel tracing to the test writer.
///
/// Use `RUST_LOG` to override the default filter. Safe to call from every test.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,rddl_grounding=info,rddl_runtime=info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Options for building the HVAC harness.
#[derive(Debug, Clone)]
pub struct HvacOptions {
    pub seed: u64,
    pub error_policy: ErrorPolicy,
    pub parallel: LevelParallelConfig,
    /// Declare a noisy temperature sensor and observe it instead of the state.
    pub pomdp: bool,
    /// Evaluate the zone update before the heat flow it reads.
    pub reverse_levels: bool,
    /// Standard deviation of the zone temperature noise.
    pub noise_std: f64,
}

impl Default for HvacOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            error_policy: ErrorPolicy::Raise,
            parallel: LevelParallelConfig::sequential(),
            pomdp: false,
            reverse_levels: false,
            noise_std: 0.05,
        }
    }
}

/// The lifted HVAC model: 2 heaters, 3 zones, one enum-valued action.
pub fn hvac_model(options: &HvacOptions) -> LiftedModel {
    let mut model = LiftedModel::new("hvac", "inst_2h_3z")
        .with_type("zone", ["z1", "z2", "z3"])
        .with_type("heater", ["h1", "h2"])
        .with_enum("heater-mode", ["@low", "@high"])
        .with_pvariable("TEMP-ZONE-MIN", &[], "real", Role::NonFluent)
        .with_pvariable("TEMP-ZONE-MAX", &[], "real", Role::NonFluent)
        .with_pvariable("MAX-HEAT-INPUT", &[], "real", Role::NonFluent)
        .with_pvariable("NOISE-STD", &[], "real", Role::NonFluent)
        .with_pvariable("P-SWITCH", &["zone"], "real", Role::NonFluent)
        .with_pvariable("ADJ-HEATER", &["heater", "zone"], "bool", Role::NonFluent)
        .with_pvariable("ADJ-ZONES", &["zone", "zone"], "bool", Role::NonFluent)
        .with_pvariable("temp-zone", &["zone"], "real", Role::StateFluent)
        .with_pvariable("temp-heater", &["heater"], "real", Role::StateFluent)
        .with_pvariable("occupied", &["zone"], "bool", Role::StateFluent)
        .with_pvariable("heat-input", &["heater"], "real", Role::ActionFluent)
        .with_pvariable("mode", &["heater"], "heater-mode", Role::ActionFluent)
        .with_pvariable("heat-flow", &["zone"], "real", Role::Derived)
        .with_pvariable("temp-zone'", &["zone"], "real", Role::Derived)
        .with_pvariable("temp-heater'", &["heater"], "real", Role::Derived)
        .with_pvariable("occupied'", &["zone"], "bool", Role::Derived)
        .with_nonfluent("TEMP-ZONE-MIN", 22.0)
        .with_nonfluent("TEMP-ZONE-MAX", 25.0)
        .with_nonfluent("MAX-HEAT-INPUT", 10.0)
        .with_nonfluent("NOISE-STD", options.noise_std)
        .with_nonfluent("P-SWITCH(z2)", 0.3)
        .with_nonfluent("ADJ-HEATER(h1, z1)", true)
        .with_nonfluent("ADJ-HEATER(h1, z2)", true)
        .with_nonfluent("ADJ-HEATER(h2, z2)", true)
        .with_nonfluent("ADJ-HEATER(h2, z3)", true)
        .with_nonfluent("ADJ-ZONES(z1, z2)", true)
        .with_nonfluent("ADJ-ZONES(z2, z3)", true)
        .with_init_state("temp-zone(z1)", 10.0)
        .with_init_state("temp-zone(z2)", 15.0)
        .with_init_state("temp-zone(z3)", 20.0)
        .with_init_state("temp-heater(h1)", 5.0)
        .with_init_state("temp-heater(h2)", 8.0)
        .with_init_state("occupied(z1)", true)
        .with_default_action("mode(h1)", DeclaredValue::Literal(ObjectId::from("@low")))
        .with_default_action("mode(h2)", DeclaredValue::Literal(ObjectId::from("@low")));
    if options.pomdp {
        model = model.with_pvariable("sensed-temp", &["zone"], "real", Role::ObservFluent);
    }
    model
}

/// A pvariable operand bound at compile time.
#[derive(Clone)]
pub struct Operand {
    key: String,
    slice: LiteralSlice,
    transform: Arc<Transform>,
}

impl Operand {
    /// Bind `var(args)` inside an expression whose free variables are
    /// `sign_out`.
    pub fn bind(
        engine: &TensorEngine,
        var: &str,
        args: &[&str],
        sign_out: &Signature,
    ) -> Result<Self, GroundingError> {
        let args: Vec<VarLabel> = args.iter().map(|a| VarLabel::from(*a)).collect();
        let slice = engine.literal_slice(var, &args)?;
        let transform = engine.map(var, &args, sign_out, &slice.literals)?;
        Ok(Self {
            key: var.to_string(),
            slice,
            transform,
        })
    }

    /// The aligned operand value, or `None` if it cannot be produced.
    pub fn read(&self, store: &Store) -> Option<Tensor> {
        let value = store.get(&self.key)?;
        let sliced = self.slice.apply(value).ok()?;
        self.transform.apply(&sliced).ok()
    }

    pub fn reals(&self, store: &Store) -> Option<Vec<f64>> {
        self.read(store)
            .map(|t| t.values().map(|v| v.as_real()).collect())
    }

    pub fn transform(&self) -> &Arc<Transform> {
        &self.transform
    }
}

fn missing(rng: RngStream) -> Evaluation {
    Evaluation::with_error(Tensor::scalar(Value::Real(0.0)), rng, ErrorCode::MISSING_VALUE)
}

fn finite_check(values: &[f64]) -> ErrorCode {
    if values.iter().all(|v| v.is_finite()) {
        ErrorCode::NONE
    } else {
        ErrorCode::NON_FINITE
    }
}

fn real_vector(values: Vec<f64>, rng: RngStream, error: ErrorCode) -> Evaluation {
    let error = error | finite_check(&values);
    match Tensor::from_reals(&[values.len()], values) {
        Ok(t) => Evaluation::with_error(t, rng, error),
        Err(_) => missing(rng),
    }
}

fn truth(value: bool, rng: RngStream) -> Evaluation {
    Evaluation::ok(Tensor::scalar(Value::Bool(value)), rng)
}

fn literal_index(engine: &TensorEngine, literal: &str) -> Result<f64, GroundingError> {
    let object = ObjectId::from(literal);
    engine
        .universe()
        .literal(&object)
        .map(|(_, index)| index as f64)
        .ok_or_else(|| GroundingError::InvalidValue {
            name: literal.to_string(),
            reason: "not an enum literal".to_string(),
        })
}

/// Compile the HVAC model against `engine`.
pub fn compile_hvac(
    engine: &TensorEngine,
    options: &HvacOptions,
) -> Result<CompiledModel, GroundingError> {
    let scalar = Signature::default();
    let zone = Signature::from_pairs(&[("?z", "zone")]);
    let heater = Signature::from_pairs(&[("?h", "heater")]);
    let zone_heater = Signature::from_pairs(&[("?z", "zone"), ("?h", "heater")]);
    let n_heaters = engine.universe().cardinality(&TypeId::from("heater"))?;

    // heat-flow(?z) = sum_{?h} ADJ-HEATER(?h, ?z) * temp-heater(?h)
    let adj = Operand::bind(engine, "ADJ-HEATER", &["?h", "?z"], &zone_heater)?;
    let th = Operand::bind(engine, "temp-heater", &["?h"], &zone_heater)?;
    let heat_flow = compiled(move |store: &Store, rng: RngStream| {
        let (Some(adj), Some(th)) = (adj.reals(store), th.reals(store)) else {
            return missing(rng);
        };
        let flow = adj
            .chunks(n_heaters)
            .zip(th.chunks(n_heaters))
            .map(|(a, t)| a.iter().zip(t).map(|(a, t)| a * t).sum())
            .collect();
        real_vector(flow, rng, ErrorCode::NONE)
    });

    // temp-heater'(?h) = temp-heater(?h) + heat-input(?h) * [mode(?h) == @high ? 2 : 1]
    let th = Operand::bind(engine, "temp-heater", &["?h"], &heater)?;
    let input = Operand::bind(engine, "heat-input", &["?h"], &heater)?;
    let mode = Operand::bind(engine, "mode", &["?h"], &heater)?;
    let high = literal_index(engine, "@high")?;
    let temp_heater_next = compiled(move |store: &Store, rng: RngStream| {
        let (Some(th), Some(input), Some(mode)) =
            (th.reals(store), input.reals(store), mode.reals(store))
        else {
            return missing(rng);
        };
        let next = th
            .iter()
            .zip(&input)
            .zip(&mode)
            .map(|((t, i), m)| t + i * if *m == high { 2.0 } else { 1.0 })
            .collect();
        real_vector(next, rng, ErrorCode::NONE)
    });

    // occupied'(?z) = Bernoulli(P-SWITCH(?z)) ? ~occupied(?z) : occupied(?z)
    let p_switch = Operand::bind(engine, "P-SWITCH", &["?z"], &zone)?;
    let occupied = Operand::bind(engine, "occupied", &["?z"], &zone)?;
    let occupied_next = compiled(move |store: &Store, mut rng: RngStream| {
        let (Some(p), Some(occ)) = (p_switch.reals(store), occupied.reals(store)) else {
            return missing(rng);
        };
        let mut error = ErrorCode::NONE;
        let next: Vec<bool> = p
            .iter()
            .zip(&occ)
            .map(|(p, o)| {
                if !(0.0..=1.0).contains(p) {
                    error |= ErrorCode::INVALID_DISTRIBUTION_PARAM;
                }
                rng.bernoulli(*p) != (*o > 0.0)
            })
            .collect();
        match Tensor::from_bools(&[next.len()], next) {
            Ok(t) => Evaluation::with_error(t, rng, error),
            Err(_) => missing(rng),
        }
    });

    // temp-zone'(?z) = temp-zone(?z) + 0.1 * heat-flow(?z) - 0.5 + Normal(0, NOISE-STD)
    let tz = Operand::bind(engine, "temp-zone", &["?z"], &zone)?;
    let flow = Operand::bind(engine, "heat-flow", &["?z"], &zone)?;
    let noise = Operand::bind(engine, "NOISE-STD", &[], &scalar)?;
    let temp_zone_next = compiled(move |store: &Store, mut rng: RngStream| {
        let (Some(tz), Some(flow), Some(noise)) =
            (tz.reals(store), flow.reals(store), noise.reals(store))
        else {
            return missing(rng);
        };
        let std = noise[0];
        let error = if std < 0.0 {
            ErrorCode::INVALID_DISTRIBUTION_PARAM
        } else {
            ErrorCode::NONE
        };
        let next = tz
            .iter()
            .zip(&flow)
            .map(|(t, f)| t + 0.1 * f - 0.5 + rng.normal_with(0.0, std))
            .collect();
        real_vector(next, rng, error)
    });

    // reward = -sum_{?h} heat-input(?h)
    //          - 10 * sum_{?z} [temp-zone(?z) < MIN | temp-zone(?z) > MAX]
    let input = Operand::bind(engine, "heat-input", &["?h"], &heater)?;
    let tz = Operand::bind(engine, "temp-zone", &["?z"], &zone)?;
    let min = Operand::bind(engine, "TEMP-ZONE-MIN", &[], &zone)?;
    let max = Operand::bind(engine, "TEMP-ZONE-MAX", &[], &zone)?;
    let reward = compiled(move |store: &Store, rng: RngStream| {
        let (Some(input), Some(tz), Some(min), Some(max)) = (
            input.reals(store),
            tz.reals(store),
            min.reals(store),
            max.reals(store),
        ) else {
            return missing(rng);
        };
        let cost: f64 = input.iter().sum();
        let violations = tz
            .iter()
            .zip(min.iter().zip(&max))
            .filter(|(t, (lo, hi))| t < lo || t > hi)
            .count();
        let reward = -cost - 10.0 * violations as f64;
        Evaluation::with_error(
            Tensor::scalar(Value::Real(reward)),
            rng,
            finite_check(&[reward]),
        )
    });

    // invariant: forall_{?h} temp-heater(?h) >= 0
    let th = Operand::bind(engine, "temp-heater", &["?h"], &heater)?;
    let heater_nonnegative = compiled(move |store: &Store, rng: RngStream| match th.reals(store) {
        Some(th) => truth(th.iter().all(|t| *t >= 0.0), rng),
        None => missing(rng),
    });

    // precondition: forall_{?h} heat-input(?h) <= MAX-HEAT-INPUT
    let input = Operand::bind(engine, "heat-input", &["?h"], &heater)?;
    let limit = Operand::bind(engine, "MAX-HEAT-INPUT", &[], &heater)?;
    let input_bounded = compiled(move |store: &Store, rng: RngStream| {
        match (input.reals(store), limit.reals(store)) {
            (Some(input), Some(limit)) => {
                truth(input.iter().zip(&limit).all(|(i, l)| i <= l), rng)
            }
            _ => missing(rng),
        }
    });

    // termination: exists_{?z} temp-zone(?z) > TEMP-ZONE-MAX + 10
    let tz = Operand::bind(engine, "temp-zone", &["?z"], &zone)?;
    let max = Operand::bind(engine, "TEMP-ZONE-MAX", &[], &zone)?;
    let overheated = compiled(move |store: &Store, rng: RngStream| {
        match (tz.reals(store), max.reals(store)) {
            (Some(tz), Some(max)) => truth(tz.iter().zip(&max).any(|(t, m)| *t > m + 10.0), rng),
            _ => missing(rng),
        }
    });

    let first = ["heat-flow", "temp-heater'", "occupied'"];
    let second = ["temp-zone'"];
    let mut model = CompiledModel::new(reward)
        .with_invariant(heater_nonnegative)
        .with_precondition(input_bounded)
        .with_termination(overheated)
        .with_cpf("heat-flow", heat_flow)
        .with_cpf("temp-heater'", temp_heater_next)
        .with_cpf("occupied'", occupied_next)
        .with_cpf("temp-zone'", temp_zone_next);
    model = if options.reverse_levels {
        model.with_level(second).with_level(first)
    } else {
        model.with_level(first).with_level(second)
    };
    model = model
        .with_next_state("temp-zone", "temp-zone'")
        .with_next_state("temp-heater", "temp-heater'")
        .with_next_state("occupied", "occupied'");

    if options.pomdp {
        // sensed-temp(?z) = round(temp-zone'(?z))
        let tz_next = Operand::bind(engine, "temp-zone'", &["?z"], &zone)?;
        let sensed = compiled(move |store: &Store, rng: RngStream| match tz_next.reals(store) {
            Some(t) => real_vector(t.iter().map(|v| v.round()).collect(), rng, ErrorCode::NONE),
            None => missing(rng),
        });
        model = model
            .with_cpf("sensed-temp", sensed)
            .with_level(["sensed-temp"])
            .with_observation("sensed-temp");
    }
    Ok(model)
}

/// Test harness driving the HVAC model.
pub struct HvacHarness {
    sim: Simulator,
}

impl HvacHarness {
    /// Build engine, compiled model and simulator.
    ///
    /// # Panics
    ///
    /// Panics if grounding, compilation or simulator construction fails.
    pub fn new(options: HvacOptions) -> Self {
        init_logging();
        let model = hvac_model(&options);
        let engine = TensorEngine::new(&model, &GroundingConfig::default(), Arc::new(NullDebugLog))
            .unwrap_or_else(|e| panic!("grounding failed: {e}"));
        let compiled = compile_hvac(&engine, &options)
            .unwrap_or_else(|e| panic!("compilation failed: {e}"));
        let config = SimulatorConfig {
            error_policy: options.error_policy,
            parallel: options.parallel.clone(),
        };
        let sim = Simulator::new(
            Arc::new(engine),
            compiled,
            config,
            RngStream::new(options.seed),
        )
        .unwrap_or_else(|e| panic!("simulator construction failed: {e}"));
        Self { sim }
    }

    pub fn sim(&self) -> &Simulator {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulator {
        &mut self.sim
    }

    /// Step once, panicking on failure.
    pub fn step(&mut self, actions: &Actions) -> StepOutcome {
        self.sim
            .step(actions)
            .unwrap_or_else(|e| panic!("step failed: {e}"))
    }

    /// Step `n` times with the same actions.
    pub fn run(&mut self, n: usize, actions: &Actions) -> Vec<StepOutcome> {
        (0..n).map(|_| self.step(actions)).collect()
    }

    /// Current value of a store key as reals.
    pub fn reals(&self, key: &str) -> Vec<f64> {
        self.sim
            .store()
            .get(key)
            .map(|t| t.values().map(|v| v.as_real()).collect())
            .unwrap_or_default()
    }
}

/// Actions setting the heat input of each heater.
pub fn heat_actions(h1: f64, h2: f64) -> Actions {
    Actions::from([
        ("heat-input(h1)".to_string(), DeclaredValue::from(h1)),
        ("heat-input(h2)".to_string(), DeclaredValue::from(h2)),
    ])
}
