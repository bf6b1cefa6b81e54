//! Resolved storage layout of each pvariable.

use indexmap::IndexMap;

use rddl_foundation::{DType, PVarId, TypeId, ValueRange};

use crate::error::{GroundingError, Result};
use crate::grounded::GroundedName;
use crate::model::{LiftedModel, Role};
use crate::universe::ObjectUniverse;

/// Everything needed to store and ground one pvariable.
#[derive(Debug, Clone, PartialEq)]
pub struct PVarLayout {
    pub name: PVarId,
    pub params: Vec<TypeId>,
    pub range: ValueRange,
    pub role: Role,
    /// Lifted tensor shape: one axis per parameter, sized by its type.
    pub shape: Vec<usize>,
    /// Groundings in canonical (row-major) order.
    pub grounded: Vec<GroundedName>,
}

impl PVarLayout {
    pub fn dtype(&self) -> DType {
        self.range.dtype()
    }

    /// Number of grounded instances (1 for a non-parameterized pvariable).
    pub fn size(&self) -> usize {
        self.grounded.len()
    }
}

/// Resolve range, shape and groundings for every declared pvariable.
pub fn resolve_layouts(
    model: &LiftedModel,
    universe: &ObjectUniverse,
) -> Result<IndexMap<PVarId, PVarLayout>> {
    let mut layouts = IndexMap::with_capacity(model.pvariables.len());
    for (name, decl) in &model.pvariables {
        let range = match ValueRange::primitive(&decl.range) {
            Some(range) => range,
            None => {
                let type_id = TypeId::from(decl.range.as_str());
                if !universe.is_enum(&type_id) {
                    return Err(GroundingError::TypeDeclaration {
                        subject: name.to_string(),
                        range: decl.range.clone(),
                        reason: "must be bool, int, real or a declared enum type".to_string(),
                    });
                }
                ValueRange::Enum(type_id)
            }
        };
        let shape = universe.shape(&decl.params)?;
        let grounded = universe.grounded_names(name, &decl.params)?;
        layouts.insert(
            name.clone(),
            PVarLayout {
                name: name.clone(),
                params: decl.params.clone(),
                range,
                role: decl.role,
                shape,
                grounded,
            },
        );
    }
    Ok(layouts)
}
