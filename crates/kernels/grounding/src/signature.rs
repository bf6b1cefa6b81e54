//! Axis signatures.

use std::fmt;

use rddl_foundation::{TypeId, VarLabel};

/// What each axis of an array represents: one (label, type) pair per axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature(Vec<(VarLabel, TypeId)>);

impl Signature {
    pub fn new(axes: Vec<(VarLabel, TypeId)>) -> Self {
        Self(axes)
    }

    /// Build from `(label, type)` string pairs, e.g. `[("?z", "zone")]`.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(label, type_id)| (VarLabel::from(*label), TypeId::from(*type_id)))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &(VarLabel, TypeId)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeId> {
        self.0.iter().map(|(_, t)| t)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (label, type_id)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", label, type_id)?;
        }
        f.write_str("]")
    }
}

impl FromIterator<(VarLabel, TypeId)> for Signature {
    fn from_iter<I: IntoIterator<Item = (VarLabel, TypeId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
