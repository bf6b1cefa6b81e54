//! Literal slicing.
//!
//! When an invocation binds some parameters to concrete literals (`adj(h1, ?z)`)
//! the bound axes are fixed before alignment and eliminated from the array.

use std::collections::BTreeSet;

use rddl_foundation::{AxisSelector, ObjectId, PVarId, Tensor, TypeId, VarLabel};

use crate::error::{GroundingError, Result};
use crate::universe::ObjectUniverse;

/// Per-axis selectors for one invocation plus the literal positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralSlice {
    pub selectors: Vec<AxisSelector>,
    pub literals: BTreeSet<usize>,
}

impl LiteralSlice {
    /// Whether no axis is fixed.
    pub fn is_full(&self) -> bool {
        self.literals.is_empty()
    }

    /// Fix the literal axes of `value`, dropping them from the result.
    pub fn apply(&self, value: &Tensor) -> Result<Tensor> {
        if self.is_full() {
            return Ok(value.clone());
        }
        Ok(value.select(&self.selectors)?)
    }
}

/// Compute selectors for `pvar(args)`.
///
/// An argument is a literal when it names an enum literal or, more generally,
/// any concrete object rather than a `?`-prefixed free variable. Enum literals
/// must belong to the declared parameter type at their position; concrete
/// objects must be members of it.
pub fn literal_slice(
    universe: &ObjectUniverse,
    pvar: &PVarId,
    params: &[TypeId],
    args: &[VarLabel],
) -> Result<LiteralSlice> {
    if args.len() != params.len() {
        return Err(GroundingError::Arity {
            pvar: pvar.clone(),
            expected: params.len(),
            found: args.len(),
        });
    }
    let mut selectors = Vec::with_capacity(args.len());
    let mut literals = BTreeSet::new();
    for (i, (arg, param)) in args.iter().zip(params).enumerate() {
        let object = ObjectId::from(arg.as_str());
        if let Some((enum_type, index)) = universe.literal(&object) {
            if enum_type != param {
                return Err(GroundingError::SignatureTypeMismatch {
                    pvar: pvar.clone(),
                    position: i + 1,
                    expected: param.clone(),
                    argument: arg.to_string(),
                    found: enum_type.clone(),
                });
            }
            selectors.push(AxisSelector::Index(index));
            literals.insert(i);
        } else if !arg.is_free() {
            selectors.push(AxisSelector::Index(universe.index_of(param, &object)?));
            literals.insert(i);
        } else {
            selectors.push(AxisSelector::All);
        }
    }
    Ok(LiteralSlice {
        selectors,
        literals,
    })
}
