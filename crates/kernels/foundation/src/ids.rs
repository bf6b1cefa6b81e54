//! Identifiers for declared model symbols.
//!
//! Every symbol crossing a crate boundary (pvariables, types, objects and the
//! free-variable labels used inside expressions) is a typed string wrapper.
//! The wrappers keep the symbol spaces apart at compile time and serialize as
//! plain strings.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Creates a new identifier.
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id!(
    /// Name of a declared pvariable (e.g. `"temp-zone"`).
    PVarId
);

define_id!(
    /// Name of a declared object type or enum type (e.g. `"zone"`).
    TypeId
);

define_id!(
    /// Name of an object instance or enum literal (e.g. `"z1"`, `"@low"`).
    ObjectId
);

define_id!(
    /// Free-variable label used when a pvariable is invoked (e.g. `"?z"`).
    VarLabel
);

impl VarLabel {
    /// Whether the label is written as a free variable (`?x`).
    pub fn is_free(&self) -> bool {
        self.0.starts_with('?')
    }
}
