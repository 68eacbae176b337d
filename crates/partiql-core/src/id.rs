//! Strongly-typed identifiers used across the engine.
//!
//! Downstream crates (planner, operators, eval) should *not* pass raw integers
//! around for catalog or registry handles.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

// Opaque catalog handle for a global variable.
new_id!(GlobalId);
// Index of a scalar function in a `FunctionRegistry`.
new_id!(FnId);
// Index of an aggregate function in a `FunctionRegistry`.
new_id!(AggId);
