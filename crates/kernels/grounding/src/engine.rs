//! Grounding engine facade.
//!
//! [`TensorEngine`] owns the object universe, the resolved layouts, the
//! initial store values and the transform cache. The expression compiler
//! calls [`TensorEngine::literal_slice`] and [`TensorEngine::map`] while
//! building functions; the simulator calls [`TensorEngine::expand`] and the
//! grounded-name resolvers at the action/observation boundary.
//!
//! Values are addressed by *store key*. In lifted mode the key is the
//! pvariable name and the value its whole tensor; in grounded mode the key is
//! the canonical grounded name and the value a rank-0 tensor.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, trace};

use rddl_foundation::{PVarId, Tensor, TypeId, Value, VarLabel};

use crate::align::{plan_alignment, Transform, TransformCache};
use crate::config::GroundingConfig;
use crate::debug_log::{open_debug_log, DebugLog};
use crate::error::{GroundingError, Result};
use crate::grounded::GroundedName;
use crate::init::{build_lifted_values, resolve_value};
use crate::layout::{resolve_layouts, PVarLayout};
use crate::model::{DeclaredValue, LiftedModel, Role};
use crate::signature::Signature;
use crate::slicing::{literal_slice, LiteralSlice};
use crate::universe::ObjectUniverse;

/// Grounding and tensor alignment for one (domain, instance).
pub struct TensorEngine {
    domain: String,
    instance: String,
    universe: ObjectUniverse,
    layouts: IndexMap<PVarId, PVarLayout>,
    grounded: bool,
    init_values: IndexMap<String, Tensor>,
    /// Grounded-mode store keys and the grounding each one holds.
    grounded_slots: HashMap<String, GroundedName>,
    cache: TransformCache,
    debug_log: Arc<dyn DebugLog>,
}

impl TensorEngine {
    /// Build the engine, opening the debug log named by `config`.
    pub fn from_model(model: &LiftedModel, config: &GroundingConfig) -> Result<Self> {
        let debug_log = open_debug_log(config.debug_log.as_ref(), &model.domain, &model.instance)?;
        Self::new(model, config, debug_log)
    }

    /// Build the engine with an explicit debug log.
    pub fn new(
        model: &LiftedModel,
        config: &GroundingConfig,
        debug_log: Arc<dyn DebugLog>,
    ) -> Result<Self> {
        let universe = ObjectUniverse::new(model)?;
        let layouts = resolve_layouts(model, &universe)?;
        let lifted = build_lifted_values(model, &universe, &layouts)?;

        let mut init_values = IndexMap::new();
        let mut grounded_slots = HashMap::new();
        if config.force_grounded {
            for (pvar, tensor) in &lifted {
                let layout = &layouts[pvar];
                for (name, value) in layout.grounded.iter().zip(tensor.values()) {
                    let key = name.to_string();
                    init_values.insert(key.clone(), Tensor::scalar(value));
                    grounded_slots.insert(key, name.clone());
                }
            }
        } else {
            for (pvar, tensor) in lifted {
                init_values.insert(pvar.to_string(), tensor);
            }
        }

        let engine = Self {
            domain: model.domain.clone(),
            instance: model.instance.clone(),
            universe,
            layouts,
            grounded: config.force_grounded,
            init_values,
            grounded_slots,
            cache: TransformCache::new(),
            debug_log,
        };
        engine.log_initial_values();
        info!(
            domain = %engine.domain,
            instance = %engine.instance,
            pvariables = engine.layouts.len(),
            slots = engine.init_values.len(),
            grounded = engine.grounded,
            "grounding engine ready"
        );
        Ok(engine)
    }

    fn log_initial_values(&self) {
        if !self.debug_log.is_enabled() {
            return;
        }
        let mut msg = String::from("initial values:");
        for (key, value) in &self.init_values {
            let _ = write!(msg, "\n\t{} = {}", key, value);
        }
        self.debug_log.write(&msg);
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn universe(&self) -> &ObjectUniverse {
        &self.universe
    }

    pub fn layouts(&self) -> &IndexMap<PVarId, PVarLayout> {
        &self.layouts
    }

    pub fn layout(&self, pvar: &str) -> Result<&PVarLayout> {
        self.layouts
            .get(pvar)
            .ok_or_else(|| GroundingError::UnknownPVariable(PVarId::from(pvar)))
    }

    /// Whether values are stored one scalar per grounding.
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Initial value of every store key, in declaration order.
    pub fn init_values(&self) -> &IndexMap<String, Tensor> {
        &self.init_values
    }

    pub fn debug_log(&self) -> &Arc<dyn DebugLog> {
        &self.debug_log
    }

    /// Number of distinct transforms built so far.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Store keys of every pvariable with `role`, in declaration order.
    pub fn keys_with_role(&self, role: Role) -> Vec<String> {
        self.layouts
            .values()
            .filter(|l| l.role == role)
            .flat_map(|l| {
                if self.grounded {
                    l.grounded.iter().map(ToString::to_string).collect::<Vec<_>>()
                } else {
                    vec![l.name.to_string()]
                }
            })
            .collect()
    }

    /// Layout of the pvariable behind a store key, plus the grounding for
    /// grounded-mode keys.
    pub fn layout_of_key(&self, key: &str) -> Result<(&PVarLayout, Option<&GroundedName>)> {
        if let Some(name) = self.grounded_slots.get(key) {
            return Ok((self.layout(name.pvar.as_str())?, Some(name)));
        }
        Ok((self.layout(key)?, None))
    }

    /// Parameter types of a store key: none for a grounded-mode scalar.
    fn params_of(&self, key: &str) -> Result<&[TypeId]> {
        let (layout, grounding) = self.layout_of_key(key)?;
        Ok(match grounding {
            Some(_) => &[],
            None => layout.params.as_slice(),
        })
    }

    /// Selectors fixing the literal arguments of `var(args)`.
    pub fn literal_slice(&self, var: &str, args: &[VarLabel]) -> Result<LiteralSlice> {
        let params = self.params_of(var)?;
        literal_slice(&self.universe, &PVarId::from(var), params, args)
    }

    /// Transform presenting the (literal-sliced) value of `var(args)` under
    /// `sign_out`.
    ///
    /// Identical requests return the same cached [`Transform`].
    pub fn map(
        &self,
        var: &str,
        args: &[VarLabel],
        sign_out: &Signature,
        literals: &BTreeSet<usize>,
    ) -> Result<Arc<Transform>> {
        let pvar = PVarId::from(var);
        let params = self.params_of(var)?;
        let plan = plan_alignment(&self.universe, &pvar, params, args, sign_out, literals)?;
        let (transform, hit) = self.cache.get_or_insert(plan.key.clone());
        trace!(var, op = %plan.key.op, cache_hit = hit, "alignment");

        if self.debug_log.is_enabled() {
            self.debug_log.write(&format!(
                "computing info for filling missing pvariable arguments:\
                 \n\tvar           ={}\
                 \n\toriginal args ={}\
                 \n\tliterals      ={:?}\
                 \n\tnew args      ={}\
                 \n\ttarget args   ={}\
                 \n\tnew axes      ={:?}\
                 \n\toperation     ={}\
                 \n\tcache hit     ={}",
                var,
                plan.original,
                literals,
                plan.input,
                sign_out,
                plan.key.new_axes,
                plan.key.op,
                hit
            ));
        }
        Ok(transform)
    }

    /// Pair every element of `value` with its grounded name, in canonical
    /// grounding order.
    pub fn expand(&self, key: &str, value: &Tensor) -> Result<Vec<(GroundedName, Value)>> {
        let (layout, grounding) = self.layout_of_key(key)?;
        let names: &[GroundedName] = match grounding {
            Some(name) => std::slice::from_ref(name),
            None => &layout.grounded,
        };
        if names.len() != value.len() {
            return Err(GroundingError::CardinalityMismatch {
                pvar: layout.name.clone(),
                expected: names.len(),
                found: value.len(),
            });
        }
        Ok(names.iter().cloned().zip(value.values()).collect())
    }

    /// Store key and coordinates (within that key's value) of a grounding.
    pub fn resolve_grounded(&self, name: &GroundedName) -> Result<(String, Vec<usize>)> {
        let layout = self.layout(name.pvar.as_str())?;
        let coords = self.universe.coordinates(name, &layout.params)?;
        if self.grounded {
            Ok((name.to_string(), Vec::new()))
        } else {
            Ok((layout.name.to_string(), coords))
        }
    }

    /// Check a supplied value against the range of the grounding it targets.
    pub fn resolve_value(&self, name: &GroundedName, declared: &DeclaredValue) -> Result<Value> {
        let layout = self.layout(name.pvar.as_str())?;
        resolve_value(name, declared, &layout.range, &self.universe)
    }

    /// Decode an enum-ranged value back to its literal name.
    pub fn decode_literal(&self, pvar: &str, value: Value) -> Result<Option<String>> {
        let layout = self.layout(pvar)?;
        let Some(enum_type) = layout.range.enum_type() else {
            return Ok(None);
        };
        let index = value.as_int().ok_or_else(|| GroundingError::InvalidValue {
            name: pvar.to_string(),
            reason: format!("enum value must be an integer, got {}", value),
        })?;
        let literal = self.universe.literal_name(enum_type, index)?;
        debug!(pvar, index, literal = %literal, "decoded enum value");
        Ok(Some(literal.to_string()))
    }
}
