//! Lifted model interface.
//!
//! The lifted model is produced upstream (parser plus model builder) and
//! consumed here as plain data: declared types and their objects, the enum
//! types, every pvariable's parameters, range and role, and the sparse
//! declared values for non-fluents, initial state and default actions.
//!
//! Sparse values are keyed by grounded name (`name(a1, a2)` or `name`).
//! Ranges are kept as the raw declared name and resolved when the grounding
//! engine is built, so a bad range surfaces as a construction error there.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use rddl_foundation::{ObjectId, PVarId, TypeId, Value};

/// Role of a pvariable in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    NonFluent,
    StateFluent,
    ActionFluent,
    ObservFluent,
    /// Produced by a CPF (interm, derived and next-state variables).
    Derived,
}

/// Declaration of one pvariable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PVarDecl {
    /// Parameter types in declaration order; empty when not parameterized.
    #[serde(default)]
    pub params: Vec<TypeId>,
    /// Declared range: `bool`, `int`, `real` or the name of an enum type.
    pub range: String,
    pub role: Role,
}

/// A sparse declared value: a primitive, or an enum literal by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredValue {
    Value(Value),
    Literal(ObjectId),
}

impl From<Value> for DeclaredValue {
    fn from(v: Value) -> Self {
        DeclaredValue::Value(v)
    }
}

impl From<bool> for DeclaredValue {
    fn from(v: bool) -> Self {
        DeclaredValue::Value(Value::Bool(v))
    }
}

impl From<i64> for DeclaredValue {
    fn from(v: i64) -> Self {
        DeclaredValue::Value(Value::Int(v))
    }
}

impl From<f64> for DeclaredValue {
    fn from(v: f64) -> Self {
        DeclaredValue::Value(Value::Real(v))
    }
}

/// The lifted model consumed by the grounding engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiftedModel {
    pub domain: String,
    pub instance: String,
    /// Every type (object and enum) with its objects in declaration order.
    pub types: IndexMap<TypeId, Vec<ObjectId>>,
    /// Types whose objects are enum literals.
    pub enum_types: IndexSet<TypeId>,
    pub pvariables: IndexMap<PVarId, PVarDecl>,
    pub nonfluents: IndexMap<String, DeclaredValue>,
    pub init_state: IndexMap<String, DeclaredValue>,
    /// Default (no-op) action values.
    pub actions: IndexMap<String, DeclaredValue>,
}

impl LiftedModel {
    pub fn new(domain: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            instance: instance.into(),
            ..Self::default()
        }
    }

    /// Declare an object type.
    pub fn with_type<I, O>(mut self, name: &str, objects: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ObjectId>,
    {
        self.types
            .insert(TypeId::from(name), objects.into_iter().map(Into::into).collect());
        self
    }

    /// Declare an enum type and its literals.
    pub fn with_enum<I, O>(mut self, name: &str, literals: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ObjectId>,
    {
        self = self.with_type(name, literals);
        self.enum_types.insert(TypeId::from(name));
        self
    }

    pub fn with_pvariable(mut self, name: &str, params: &[&str], range: &str, role: Role) -> Self {
        self.pvariables.insert(
            PVarId::from(name),
            PVarDecl {
                params: params.iter().map(|p| TypeId::from(*p)).collect(),
                range: range.to_string(),
                role,
            },
        );
        self
    }

    pub fn with_nonfluent(mut self, grounded: &str, value: impl Into<DeclaredValue>) -> Self {
        self.nonfluents.insert(grounded.to_string(), value.into());
        self
    }

    pub fn with_init_state(mut self, grounded: &str, value: impl Into<DeclaredValue>) -> Self {
        self.init_state.insert(grounded.to_string(), value.into());
        self
    }

    pub fn with_default_action(mut self, grounded: &str, value: impl Into<DeclaredValue>) -> Self {
        self.actions.insert(grounded.to_string(), value.into());
        self
    }

    /// Declared parameter types of a pvariable.
    pub fn param_types(&self, pvar: &PVarId) -> Option<&[TypeId]> {
        self.pvariables.get(pvar).map(|d| d.params.as_slice())
    }

    /// Pvariables with the given role, in declaration order.
    pub fn pvariables_with_role(&self, role: Role) -> impl Iterator<Item = &PVarId> {
        self.pvariables
            .iter()
            .filter(move |(_, d)| d.role == role)
            .map(|(name, _)| name)
    }

    /// All declared sparse values: non-fluents, then initial state, then
    /// default actions.
    pub fn declared_values(&self) -> impl Iterator<Item = (&String, &DeclaredValue)> {
        self.nonfluents
            .iter()
            .chain(self.init_state.iter())
            .chain(self.actions.iter())
    }
}
