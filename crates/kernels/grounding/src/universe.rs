//! Object universe.
//!
//! Assigns every object of every declared type a dense index in
//! `[0, |type|)`, in declaration order. Enum literals are objects of enum
//! types; each literal additionally resolves back to the one enum type that
//! declares it.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use rddl_foundation::{ObjectId, PVarId, TypeId};

use crate::error::{GroundingError, Result};
use crate::grounded::GroundedName;
use crate::model::LiftedModel;

/// Index tables for all declared types.
#[derive(Debug, Clone, Default)]
pub struct ObjectUniverse {
    types: IndexMap<TypeId, IndexSet<ObjectId>>,
    enum_types: IndexSet<TypeId>,
    /// Reverse lookup from enum literal to its enum type.
    literal_types: HashMap<ObjectId, TypeId>,
}

impl ObjectUniverse {
    /// Build the index tables for every type in the model.
    ///
    /// Fails if a type lists an object twice, if an enum type is not a
    /// declared type, or if a literal is declared by two enum types.
    pub fn new(model: &LiftedModel) -> Result<Self> {
        let mut types = IndexMap::with_capacity(model.types.len());
        for (type_id, objects) in &model.types {
            let mut set = IndexSet::with_capacity(objects.len());
            for object in objects {
                if !set.insert(object.clone()) {
                    return Err(GroundingError::ObjectResolution {
                        object: object.clone(),
                        type_id: type_id.clone(),
                        reason: "object declared twice".to_string(),
                    });
                }
            }
            types.insert(type_id.clone(), set);
        }

        let mut literal_types = HashMap::new();
        for enum_type in &model.enum_types {
            let literals = types
                .get(enum_type)
                .ok_or_else(|| GroundingError::TypeDeclaration {
                    subject: "enum declaration".to_string(),
                    range: enum_type.to_string(),
                    reason: "enum type has no declared literals".to_string(),
                })?;
            for literal in literals {
                if let Some(previous) = literal_types.insert(literal.clone(), enum_type.clone()) {
                    return Err(GroundingError::ObjectResolution {
                        object: literal.clone(),
                        type_id: enum_type.clone(),
                        reason: format!("literal is already declared by enum <{}>", previous),
                    });
                }
            }
        }

        Ok(Self {
            types,
            enum_types: model.enum_types.clone(),
            literal_types,
        })
    }

    fn objects_of(&self, type_id: &TypeId) -> Result<&IndexSet<ObjectId>> {
        self.types
            .get(type_id)
            .ok_or_else(|| GroundingError::UnknownType(type_id.clone()))
    }

    /// Index of `object` within `type_id`.
    pub fn index_of(&self, type_id: &TypeId, object: &ObjectId) -> Result<usize> {
        let objects = self.objects_of(type_id)?;
        objects
            .get_index_of(object)
            .ok_or_else(|| GroundingError::ObjectResolution {
                object: object.clone(),
                type_id: type_id.clone(),
                reason: format!(
                    "must be one of {:?}",
                    objects.iter().map(ObjectId::as_str).collect::<Vec<_>>()
                ),
            })
    }

    /// Object at `index` within `type_id`.
    pub fn object_at(&self, type_id: &TypeId, index: usize) -> Result<&ObjectId> {
        let objects = self.objects_of(type_id)?;
        objects
            .get_index(index)
            .ok_or_else(|| GroundingError::InvalidValue {
                name: type_id.to_string(),
                reason: format!("index {} out of range for {} objects", index, objects.len()),
            })
    }

    /// Number of objects of a type.
    pub fn cardinality(&self, type_id: &TypeId) -> Result<usize> {
        Ok(self.objects_of(type_id)?.len())
    }

    /// Objects of a type in index order.
    pub fn objects(&self, type_id: &TypeId) -> Result<impl Iterator<Item = &ObjectId>> {
        Ok(self.objects_of(type_id)?.iter())
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeId> {
        self.types.keys()
    }

    pub fn is_enum(&self, type_id: &TypeId) -> bool {
        self.enum_types.contains(type_id)
    }

    /// Resolve an enum literal to its enum type and index.
    pub fn literal(&self, object: &ObjectId) -> Option<(&TypeId, usize)> {
        let type_id = self.literal_types.get(object)?;
        let index = self.types.get(type_id)?.get_index_of(object)?;
        Some((type_id, index))
    }

    /// Decode a stored enum value back to its literal.
    pub fn literal_name(&self, enum_type: &TypeId, index: i64) -> Result<&ObjectId> {
        let index = usize::try_from(index).map_err(|_| GroundingError::InvalidValue {
            name: enum_type.to_string(),
            reason: format!("negative enum index {}", index),
        })?;
        self.object_at(enum_type, index)
    }

    /// Shape of a tensor indexed by `types`.
    pub fn shape(&self, types: &[TypeId]) -> Result<Vec<usize>> {
        types.iter().map(|t| self.cardinality(t)).collect()
    }

    /// Indices of the arguments of `name` within the corresponding `types`.
    pub fn coordinates(&self, name: &GroundedName, types: &[TypeId]) -> Result<Vec<usize>> {
        if name.args.len() != types.len() {
            return Err(GroundingError::Arity {
                pvar: name.pvar.clone(),
                expected: types.len(),
                found: name.args.len(),
            });
        }
        types
            .iter()
            .zip(&name.args)
            .map(|(t, o)| self.index_of(t, o))
            .collect()
    }

    /// Every grounding of `pvar` over `types`, in row-major order of the
    /// Cartesian product of their objects.
    pub fn grounded_names(&self, pvar: &PVarId, types: &[TypeId]) -> Result<Vec<GroundedName>> {
        let object_lists = types
            .iter()
            .map(|t| Ok(self.objects_of(t)?.iter().collect::<Vec<_>>()))
            .collect::<Result<Vec<_>>>()?;
        let shape: Vec<usize> = object_lists.iter().map(Vec::len).collect();
        let mut names = Vec::with_capacity(shape.iter().product());
        rddl_foundation::tensor::for_each_index(&shape, |index| {
            let args = index
                .iter()
                .zip(&object_lists)
                .map(|(&i, objects)| objects[i].clone())
                .collect();
            names.push(GroundedName::new(pvar.clone(), args));
        });
        Ok(names)
    }
}
