//! End-to-end tests: lifted model → tensor engine → compiled HVAC model →
//! simulator.

use std::sync::Arc;

use rddl_foundation::{ErrorPolicy, ObjectId, TypeId, Value};
use rddl_grounding::{
    DebugLogConfig, DeclaredValue, GroundedName, GroundingConfig, NullDebugLog, Signature,
    TensorEngine, TransformOp,
};
use rddl_runtime::{Actions, Error, LevelParallelConfig, Status};
use rddl_tests::{hvac_model, heat_actions, HvacHarness, HvacOptions, Operand};

fn quiet() -> HvacOptions {
    HvacOptions {
        noise_std: 0.0,
        ..HvacOptions::default()
    }
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
    }
}

fn engine(options: &HvacOptions) -> TensorEngine {
    TensorEngine::new(
        &hvac_model(options),
        &GroundingConfig::default(),
        Arc::new(NullDebugLog),
    )
    .unwrap()
}

// ============================================================================
// Alignment through the engine
// ============================================================================

#[test]
fn test_adjacency_transposed_to_zone_major() {
    let harness = HvacHarness::new(quiet());
    let sign = Signature::from_pairs(&[("?z", "zone"), ("?h", "heater")]);
    let adj = Operand::bind(harness.sim().engine(), "ADJ-HEATER", &["?h", "?z"], &sign).unwrap();

    assert_eq!(
        adj.transform().key().op,
        TransformOp::Transpose { axes: vec![1, 0] }
    );
    let value = adj.read(harness.sim().store()).unwrap();
    assert_eq!(value.shape(), &[3, 2]);
    assert_close(
        &adj.reals(harness.sim().store()).unwrap(),
        &[1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
    );
}

#[test]
fn test_scalar_nonfluent_broadcast_over_zones() {
    let harness = HvacHarness::new(quiet());
    let sign = Signature::from_pairs(&[("?z", "zone")]);
    let min = Operand::bind(harness.sim().engine(), "TEMP-ZONE-MIN", &[], &sign).unwrap();

    assert_eq!(min.transform().key().new_axes, vec![0]);
    assert_eq!(min.transform().key().op, TransformOp::Identity);
    assert_close(&min.reals(harness.sim().store()).unwrap(), &[22.0; 3]);
}

#[test]
fn test_literal_argument_selects_row() {
    let harness = HvacHarness::new(quiet());
    let sign = Signature::from_pairs(&[("?z", "zone")]);
    let row = Operand::bind(harness.sim().engine(), "ADJ-HEATER", &["h1", "?z"], &sign).unwrap();
    assert_close(&row.reals(harness.sim().store()).unwrap(), &[1.0, 1.0, 0.0]);

    let row = Operand::bind(harness.sim().engine(), "ADJ-HEATER", &["h2", "?z"], &sign).unwrap();
    assert_close(&row.reals(harness.sim().store()).unwrap(), &[0.0, 1.0, 1.0]);
}

#[test]
fn test_identical_requests_share_transform() {
    let engine = engine(&quiet());
    let sign = Signature::from_pairs(&[("?z", "zone"), ("?h", "heater")]);
    let before = engine.cache_len();

    let first = Operand::bind(&engine, "ADJ-HEATER", &["?h", "?z"], &sign).unwrap();
    let second = Operand::bind(&engine, "ADJ-HEATER", &["?h", "?z"], &sign).unwrap();
    assert!(Arc::ptr_eq(first.transform(), second.transform()));
    assert_eq!(engine.cache_len(), before + 1);

    let value = engine.init_values()["ADJ-HEATER"].clone();
    let once = first.transform().apply(&value).unwrap();
    let twice = second.transform().apply(&value).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_alignment_written_to_debug_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = GroundingConfig {
        force_grounded: false,
        debug_log: Some(DebugLogConfig {
            dir: dir.path().to_path_buf(),
        }),
    };
    let engine = TensorEngine::from_model(&hvac_model(&quiet()), &config).unwrap();
    let sign = Signature::from_pairs(&[("?z", "zone"), ("?h", "heater")]);
    Operand::bind(&engine, "ADJ-HEATER", &["?h", "?z"], &sign).unwrap();
    engine.debug_log().flush();

    let text = std::fs::read_to_string(dir.path().join("debug_hvac_inst_2h_3z.txt")).unwrap();
    assert!(text.contains("initial values:"));
    assert!(text.contains("var           =ADJ-HEATER"));
    assert!(text.contains("operation     =transpose"));
}

// ============================================================================
// Object universe and grounded mode
// ============================================================================

#[test]
fn test_object_indices_are_a_bijection() {
    let engine = engine(&quiet());
    let universe = engine.universe();
    for type_id in ["zone", "heater", "heater-mode"].map(TypeId::from) {
        let n = universe.cardinality(&type_id).unwrap();
        for i in 0..n {
            let object = universe.object_at(&type_id, i).unwrap().clone();
            assert_eq!(universe.index_of(&type_id, &object).unwrap(), i);
        }
    }
    assert!(universe
        .index_of(&TypeId::from("zone"), &ObjectId::from("h1"))
        .is_err());
}

#[test]
fn test_grounded_mode_expands_to_same_values() {
    let options = quiet();
    let lifted = engine(&options);
    let grounded = TensorEngine::new(
        &hvac_model(&options),
        &GroundingConfig {
            force_grounded: true,
            debug_log: None,
        },
        Arc::new(NullDebugLog),
    )
    .unwrap();
    assert!(grounded.is_grounded());
    assert!(grounded.init_values().contains_key("temp-zone(z2)"));

    let expand_all = |engine: &TensorEngine| {
        let mut pairs: Vec<(GroundedName, Value)> = Vec::new();
        for (key, value) in engine.init_values() {
            pairs.extend(engine.expand(key, value).unwrap());
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    };
    assert_eq!(expand_all(&lifted), expand_all(&grounded));
}

// ============================================================================
// Simulation
// ============================================================================

#[test]
fn test_level_order_decides_what_cpfs_read() {
    let mut ordered = HvacHarness::new(quiet());
    ordered.step(&heat_actions(0.0, 0.0));
    assert_close(&ordered.reals("heat-flow"), &[5.0, 13.0, 8.0]);
    assert_close(&ordered.reals("temp-zone"), &[10.0, 15.8, 20.3]);

    // temp-zone' runs first and sees the initial (zero) heat flow
    let mut reversed = HvacHarness::new(HvacOptions {
        reverse_levels: true,
        ..quiet()
    });
    reversed.step(&heat_actions(0.0, 0.0));
    assert_close(&reversed.reals("temp-zone"), &[9.5, 14.5, 19.5]);
}

#[test]
fn test_same_seed_same_trajectory() {
    let actions = heat_actions(1.0, 2.0);
    let a = HvacHarness::new(HvacOptions::default()).run(5, &actions);
    let b = HvacHarness::new(HvacOptions::default()).run(5, &actions);
    assert_eq!(a, b);

    let c = HvacHarness::new(HvacOptions {
        seed: 7,
        ..HvacOptions::default()
    })
    .run(5, &actions);
    assert_ne!(a, c);
}

#[test]
fn test_parallel_levels_match_sequential() {
    let actions = heat_actions(3.0, 1.0);
    let sequential = HvacHarness::new(HvacOptions::default()).run(8, &actions);
    let parallel = HvacHarness::new(HvacOptions {
        parallel: LevelParallelConfig {
            enabled: true,
            parallel_threshold: 1,
        },
        ..HvacOptions::default()
    })
    .run(8, &actions);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_precondition_violation_keeps_store() {
    let mut harness = HvacHarness::new(quiet());
    let before = harness.sim().store().clone();
    let result = harness
        .sim_mut()
        .check_action_preconditions(&heat_actions(50.0, 0.0));
    assert!(matches!(
        result,
        Err(Error::ActionPreconditionViolation { index: 0 })
    ));
    assert_eq!(harness.sim().store(), &before);

    harness
        .sim_mut()
        .check_action_preconditions(&heat_actions(10.0, 0.0))
        .unwrap();
    harness.sim_mut().check_state_invariants().unwrap();
}

#[test]
fn test_reward_penalizes_input_and_violations() {
    let mut harness = HvacHarness::new(quiet());
    let outcome = harness.step(&heat_actions(1.0, 2.0));
    // every zone is still below TEMP-ZONE-MIN
    assert!((outcome.reward - (-3.0 - 30.0)).abs() < 1e-9);
}

#[test]
fn test_pomdp_observes_sensor_fluents() {
    let mut harness = HvacHarness::new(HvacOptions {
        pomdp: true,
        ..quiet()
    });
    assert!(harness.sim().is_pomdp());
    let outcome = harness.step(&heat_actions(0.0, 0.0));

    let keys: Vec<&str> = outcome.observation.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["sensed-temp(z1)", "sensed-temp(z2)", "sensed-temp(z3)"]
    );
    assert_eq!(outcome.observation["sensed-temp(z2)"], Value::Real(16.0));
    assert!(harness.sim().state().contains_key("temp-zone(z2)"));
}

#[test]
fn test_overheating_terminates() {
    let mut harness = HvacHarness::new(quiet());
    let outcomes = harness.run(6, &heat_actions(10.0, 10.0));
    let first_done = outcomes.iter().position(|o| o.done);
    assert_eq!(first_done, Some(4));
    assert_eq!(harness.sim().status(), Status::Terminated);
    assert!(harness.sim_mut().check_terminal_states().unwrap());
}

#[test]
fn test_non_finite_action_follows_error_policy() {
    let nan = heat_actions(f64::NAN, 0.0);

    let mut strict = HvacHarness::new(quiet());
    match strict.sim_mut().step(&nan).unwrap_err() {
        Error::Evaluation { context, .. } => assert_eq!(context, "CPF <temp-heater'>"),
        other => panic!("unexpected error: {other}"),
    }

    for policy in [ErrorPolicy::Warn, ErrorPolicy::Ignore] {
        let mut relaxed = HvacHarness::new(HvacOptions {
            error_policy: policy,
            ..quiet()
        });
        relaxed.step(&nan);
        assert!(relaxed.reals("temp-heater")[0].is_nan());
        assert_eq!(relaxed.reals("temp-heater")[1], 8.0);
    }
}

#[test]
fn test_unknown_actions_rejected() {
    let mut harness = HvacHarness::new(quiet());
    for name in ["heat-input(h9)", "temp-zone(z1)", "cool(h1)"] {
        let actions = Actions::from([(name.to_string(), DeclaredValue::from(1.0))]);
        let err = harness.sim_mut().step(&actions).unwrap_err();
        assert!(matches!(err, Error::UnknownAction { .. }), "{name}: {err}");
    }
}

#[test]
fn test_enum_action_round_trip() {
    let mut harness = HvacHarness::new(quiet());
    let mut actions = heat_actions(2.0, 2.0);
    actions.insert(
        "mode(h1)".to_string(),
        DeclaredValue::Literal(ObjectId::from("@high")),
    );
    harness.step(&actions);

    let mode = harness.sim().store().require("mode").unwrap().clone();
    let engine = harness.sim().engine();
    let decoded: Vec<Option<String>> = mode
        .values()
        .map(|v| engine.decode_literal("mode", v).unwrap())
        .collect();
    assert_eq!(
        decoded,
        vec![Some("@high".to_string()), Some("@low".to_string())]
    );
    // @high doubles the heat input
    assert_close(&harness.reals("temp-heater"), &[9.0, 10.0]);
}

#[test]
fn test_reset_replays_initial_state() {
    let mut harness = HvacHarness::new(quiet());
    let initial = harness.sim().state().clone();
    harness.run(3, &heat_actions(4.0, 4.0));
    assert_ne!(harness.sim().state(), &initial);
    let observation = harness.sim_mut().reset().unwrap();
    assert_eq!(observation, initial);
    assert_close(&harness.reals("temp-heater"), &[5.0, 8.0]);
}
