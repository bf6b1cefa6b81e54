//! Grounded names.
//!
//! A grounded name is a pvariable plus one concrete object per parameter,
//! rendered canonically as `name(a1, a2)` and as the bare `name` when the
//! pvariable has no parameters. It is the only identifier that crosses the
//! action/observation boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use rddl_foundation::{ObjectId, PVarId};

use crate::error::{GroundingError, Result};

/// A pvariable applied to concrete objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroundedName {
    pub pvar: PVarId,
    pub args: Vec<ObjectId>,
}

impl GroundedName {
    pub fn new(pvar: PVarId, args: Vec<ObjectId>) -> Self {
        Self { pvar, args }
    }

    /// Grounded name of a non-parameterized pvariable.
    pub fn bare(pvar: PVarId) -> Self {
        Self {
            pvar,
            args: Vec::new(),
        }
    }

    /// Split `name(a1, a2)` into its pvariable and arguments.
    ///
    /// Whitespace around arguments is ignored; `name()` is the same as `name`.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| GroundingError::InvalidGroundedName {
            name: s.to_string(),
            reason: reason.to_string(),
        };
        let s = s.trim();
        let (pvar, args) = match s.find('(') {
            None => (s, Vec::new()),
            Some(open) => {
                let inner = s[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("missing closing parenthesis"))?;
                if inner.contains(['(', ')']) {
                    return Err(invalid("nested parentheses"));
                }
                let args = if inner.trim().is_empty() {
                    Vec::new()
                } else {
                    inner
                        .split(',')
                        .map(|a| {
                            let a = a.trim();
                            if a.is_empty() {
                                Err(invalid("empty argument"))
                            } else {
                                Ok(ObjectId::from(a))
                            }
                        })
                        .collect::<Result<Vec<_>>>()?
                };
                (s[..open].trim_end(), args)
            }
        };
        if pvar.is_empty() {
            return Err(invalid("empty pvariable name"));
        }
        Ok(Self::new(PVarId::from(pvar), args))
    }
}

impl fmt::Display for GroundedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pvar.as_str())?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(arg.as_str())?;
        }
        f.write_str(")")
    }
}

impl FromStr for GroundedName {
    type Err = GroundingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
