//! Initial value builder.
//!
//! Turns the model's sparse declared values (non-fluents, initial state,
//! default actions) into one dense value per pvariable. Groundings left
//! unspecified take the range default (`false` / `0` / `0.0`); enum literals
//! become their index within the pvariable's enum range.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use rddl_foundation::{PVarId, Tensor, Value, ValueRange};

use crate::error::{GroundingError, Result};
use crate::grounded::GroundedName;
use crate::layout::PVarLayout;
use crate::model::{DeclaredValue, LiftedModel};
use crate::universe::ObjectUniverse;

/// Resolve one declared value against the pvariable's range.
pub(crate) fn resolve_value(
    name: &GroundedName,
    declared: &DeclaredValue,
    range: &ValueRange,
    universe: &ObjectUniverse,
) -> Result<Value> {
    match (declared, range) {
        (DeclaredValue::Literal(literal), ValueRange::Enum(enum_type)) => {
            match universe.literal(literal) {
                Some((t, index)) if t == enum_type => Ok(Value::Int(index as i64)),
                _ => Err(GroundingError::ObjectResolution {
                    object: literal.clone(),
                    type_id: enum_type.clone(),
                    reason: format!(
                        "literal assigned to <{}> must be one of {:?}",
                        name,
                        universe
                            .objects(enum_type)?
                            .map(|o| o.as_str())
                            .collect::<Vec<_>>()
                    ),
                }),
            }
        }
        (DeclaredValue::Value(v), ValueRange::Enum(enum_type)) => Err(GroundingError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected a literal of enum <{}>, got {}", enum_type, v),
        }),
        (DeclaredValue::Literal(literal), _) => Err(GroundingError::InvalidValue {
            name: name.to_string(),
            reason: format!("literal <{}> assigned to a {} pvariable", literal, range),
        }),
        (DeclaredValue::Value(v), _) => {
            v.widen_to(range.dtype())
                .ok_or_else(|| GroundingError::InvalidValue {
                    name: name.to_string(),
                    reason: format!("{} value {} does not fit range {}", v.dtype(), v, range),
                })
        }
    }
}

/// Build the dense lifted tensor of every pvariable, keyed by pvariable name.
pub fn build_lifted_values(
    model: &LiftedModel,
    universe: &ObjectUniverse,
    layouts: &IndexMap<PVarId, PVarLayout>,
) -> Result<IndexMap<PVarId, Tensor>> {
    // Sparse declared values grouped by pvariable; later sections override
    // earlier ones for the same grounding.
    let mut sparse: HashMap<&PVarId, Vec<(Vec<usize>, Value)>> = HashMap::new();
    for (key, declared) in model.declared_values() {
        let name = GroundedName::parse(key)?;
        let (pvar, layout) = layouts
            .get_key_value(&name.pvar)
            .ok_or_else(|| GroundingError::UnknownPVariable(name.pvar.clone()))?;
        let coords = universe.coordinates(&name, &layout.params)?;
        let value = resolve_value(&name, declared, &layout.range, universe)?;
        sparse.entry(pvar).or_default().push((coords, value));
    }

    let mut values = IndexMap::with_capacity(layouts.len());
    for (pvar, layout) in layouts {
        let mut tensor = Tensor::full(&layout.shape, layout.range.default_value());
        if let Some(entries) = sparse.get(pvar) {
            for (coords, value) in entries {
                tensor.set(coords, *value)?;
            }
        }
        debug!(
            pvar = %pvar,
            shape = ?layout.shape,
            dtype = %layout.dtype(),
            declared = sparse.get(pvar).map_or(0, Vec::len),
            "initial tensor built"
        );
        values.insert(pvar.clone(), tensor);
    }
    Ok(values)
}
