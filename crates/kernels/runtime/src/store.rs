//! Live value store.
//!
//! One value per store key (see [`rddl_grounding::TensorEngine`] for the key
//! scheme). The key set is fixed when the store is built; writes replace
//! existing values only.

use indexmap::IndexMap;

use rddl_foundation::Tensor;

use crate::error::{Error, Result};

/// Mapping from store key to current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    values: IndexMap<String, Tensor>,
}

impl Store {
    pub fn new(values: IndexMap<String, Tensor>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.values.get(key)
    }

    /// Value of `key`, or [`Error::PVariableNotFound`].
    pub fn require(&self, key: &str) -> Result<&Tensor> {
        self.values
            .get(key)
            .ok_or_else(|| Error::PVariableNotFound(key.to_string()))
    }

    /// Replace the value of an existing key.
    pub fn set(&mut self, key: &str, value: Tensor) -> Result<()> {
        let slot = self
            .values
            .get_mut(key)
            .ok_or_else(|| Error::PVariableNotFound(key.to_string()))?;
        *slot = value;
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Tensor)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
